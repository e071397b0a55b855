//! Relative paths with forward-slash separators

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relative path of a synced item, stored with `/` separators.
///
/// Watermark keys, filter decisions and folder mappings all operate on
/// relative paths of this form so that a watermark written on one platform
/// stays valid on another. Conversion to a platform-native path only happens
/// at I/O boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Backslashes become `/` and trailing separators are dropped.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut inner = path.as_ref().to_string_lossy().replace('\\', "/");
        while inner.len() > 1 && inner.ends_with('/') {
            inner.pop();
        }
        Self { inner }
    }

    /// The empty relative path, i.e. the root of a recursion.
    pub fn root() -> Self {
        Self::default()
    }

    /// Compute `path` relative to `base`, or `None` when `path` is not below it.
    pub fn relative_to(base: &Path, path: &Path) -> Option<Self> {
        path.strip_prefix(base).ok().map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// True for the recursion root.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Resolve this relative path below `base`.
    pub fn under(&self, base: &Path) -> PathBuf {
        if self.inner.is_empty() {
            return base.to_path_buf();
        }
        self.components().fold(base.to_path_buf(), |acc, c| acc.join(c))
    }

    /// Append `segment`, ignoring any leading separator on it.
    pub fn join(&self, segment: &str) -> Self {
        let segment = Self::new(segment.trim_start_matches(['/', '\\']));
        match (self.inner.is_empty(), segment.inner.is_empty()) {
            (true, _) => segment,
            (_, true) => self.clone(),
            _ => Self {
                inner: format!("{}/{}", self.inner.trim_end_matches('/'), segment.inner),
            },
        }
    }

    /// The containing folder. A single segment has the root as parent and
    /// the root has none.
    pub fn parent(&self) -> Option<Self> {
        if self.inner.is_empty() {
            return None;
        }
        let trimmed = self.inner.trim_end_matches('/');
        let inner = match trimmed.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => trimmed[..idx].to_string(),
            None => String::new(),
        };
        Some(Self { inner })
    }

    /// Last segment, used for pattern matching.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Whether `self` equals `prefix` or lies below it, segment-wise.
    pub fn starts_with(&self, prefix: &NormalizedPath) -> bool {
        let mut own = self.components();
        prefix.components().all(|p| own.next() == Some(p))
    }
}

/// Number of normal components of a native path.
///
/// Used to order cleanup deepest-first.
pub fn native_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn backslashes_are_normalized() {
        let path = NormalizedPath::new(r"sub\folder\file.txt");
        assert_eq!(path.as_str(), "sub/folder/file.txt");
    }

    #[test]
    fn trailing_separator_is_dropped() {
        assert_eq!(NormalizedPath::new("sub/").as_str(), "sub");
        assert_eq!(NormalizedPath::new(r"sub\").as_str(), "sub");
    }

    #[test]
    fn join_from_root_yields_segment() {
        let joined = NormalizedPath::root().join("a.txt");
        assert_eq!(joined.as_str(), "a.txt");
        assert_eq!(joined.parent(), Some(NormalizedPath::root()));
    }

    #[test]
    fn starts_with_is_segment_aware() {
        let path = NormalizedPath::new("subfolder/b.txt");
        assert!(path.starts_with(&NormalizedPath::new("subfolder")));
        assert!(!path.starts_with(&NormalizedPath::new("sub")));
        assert!(path.starts_with(&NormalizedPath::root()));
    }

    #[test]
    fn relative_to_strips_base() {
        let base = Path::new("/tmp/src");
        let rel = NormalizedPath::relative_to(base, Path::new("/tmp/src/a/b.txt")).unwrap();
        assert_eq!(rel.as_str(), "a/b.txt");
        assert_eq!(rel.depth(), 2);
        assert!(NormalizedPath::relative_to(base, Path::new("/tmp/other")).is_none());
    }

    #[test]
    fn under_resolves_native_path() {
        let rel = NormalizedPath::new("q/r.txt");
        assert_eq!(rel.under(Path::new("/dest")), Path::new("/dest").join("q").join("r.txt"));
        assert_eq!(NormalizedPath::root().under(Path::new("/dest")), PathBuf::from("/dest"));
    }

    #[test]
    fn native_depth_counts_normal_components() {
        assert_eq!(native_depth(Path::new("/a/b/c")), 3);
        assert_eq!(native_depth(Path::new("/")), 0);
    }
}
