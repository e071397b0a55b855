//! Include/exclude filtering of synchronized items
//!
//! Patterns are `;`-separated. A pattern ending in `/` or `\` is a folder
//! pattern: without an inner separator it matches a folder name at any
//! depth, otherwise it matches the folder path relative to the recursion
//! root. Every other pattern is a case-insensitive glob on the file name.
//!
//! ```
//! use dep_fs::NormalizedPath;
//! use dep_sync::FileFilter;
//!
//! let filter = FileFilter::new(Some("*.dll;docs\\"), Some("*.tmp")).unwrap();
//! assert!(filter.is_included(&NormalizedPath::new("bin/Lib.DLL")));
//! assert!(filter.is_included(&NormalizedPath::new("docs/readme.md")));
//! assert!(!filter.is_included(&NormalizedPath::new("docs/scratch.tmp")));
//! assert!(!filter.is_included(&NormalizedPath::new("src/main.c")));
//! ```

use dep_fs::NormalizedPath;
use dep_graph::{SettingKey, Settings};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::{Error, Result};

#[derive(Debug, Clone)]
enum FolderPattern {
    /// Matches any single folder name along the path
    Name(GlobMatcher),
    /// Matches the relative folder path from the recursion root
    Path(GlobMatcher),
}

impl FolderPattern {
    /// Whether `folder` (relative) or one of its ancestors matches.
    fn covers(&self, folder: &NormalizedPath) -> bool {
        match self {
            Self::Name(glob) => folder.components().any(|segment| glob.is_match(segment)),
            Self::Path(glob) => {
                let mut prefix = NormalizedPath::root();
                folder.components().any(|segment| {
                    prefix = prefix.join(segment);
                    glob.is_match(prefix.as_str())
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
struct PatternSet {
    files: GlobSet,
    folders: Vec<FolderPattern>,
}

impl PatternSet {
    fn parse(raw: &str) -> Result<Self> {
        let mut files = GlobSetBuilder::new();
        let mut folders = Vec::new();

        for pattern in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(folder) = pattern.strip_suffix(['/', '\\']) {
                let folder = folder.replace('\\', "/");
                let glob = build_glob(&folder)?;
                if folder.contains('/') {
                    folders.push(FolderPattern::Path(glob.compile_matcher()));
                } else {
                    folders.push(FolderPattern::Name(glob.compile_matcher()));
                }
            } else {
                files.add(build_glob(pattern)?);
            }
        }

        let files = files
            .build()
            .map_err(|e| Error::configuration(format!("invalid filter '{raw}': {e}")))?;
        Ok(Self { files, folders })
    }

    fn covers_folder(&self, folder: &NormalizedPath) -> bool {
        self.folders.iter().any(|pattern| pattern.covers(folder))
    }

    fn matches_name(&self, name: &str) -> bool {
        self.files.is_match(name)
    }

    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }
}

fn build_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::configuration(format!("invalid filter pattern '{pattern}': {e}")))
}

/// Include/exclude decision for relative item paths.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<PatternSet>,
    exclude: Option<PatternSet>,
}

impl FileFilter {
    /// A filter that accepts everything.
    pub fn accept_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    /// Build from raw include and exclude pattern lists.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(PatternSet::parse).transpose()?,
            exclude: exclude
                .map(PatternSet::parse)
                .transpose()?
                .filter(|set| !set.is_empty()),
        })
    }

    /// Build from the `IncludeFilter` and `ExcludeFilter` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.get(SettingKey::IncludeFilter),
            settings.get(SettingKey::ExcludeFilter),
        )
    }

    pub fn is_accept_all(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Whether traversal may descend into `folder`.
    pub fn is_folder_excluded(&self, folder: &NormalizedPath) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.covers_folder(folder))
    }

    /// Decide a file given its path relative to the recursion root.
    pub fn is_included(&self, file: &NormalizedPath) -> bool {
        let Some(name) = file.file_name() else {
            return false;
        };
        let folder = file.parent().unwrap_or_default();

        let included = match &self.include {
            None => true,
            Some(set) => set.covers_folder(&folder) || set.matches_name(name),
        };
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|set| set.covers_folder(&folder) || set.matches_name(name));

        included && !excluded
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(path: &str) -> NormalizedPath {
        NormalizedPath::new(path)
    }

    #[rstest]
    #[case(None, None, "any/thing.bin", true)]
    #[case(Some("*.dll"), None, "bin/Core.DLL", true)]
    #[case(Some("*.dll"), None, "bin/core.pdb", false)]
    #[case(Some("sub\\"), None, "sub/a.txt", true)]
    #[case(Some("sub\\"), None, "x/sub/deep/a.txt", true)]
    #[case(Some("sub\\"), None, "a.txt", false)]
    #[case(Some("bin/debug/"), None, "bin/debug/x.pdb", true)]
    #[case(Some("bin/debug/"), None, "other/bin/debug/x.pdb", false)]
    #[case(None, Some("*.tmp"), "a.TMP", false)]
    #[case(None, Some("obj/"), "src/obj/a.o", false)]
    #[case(Some("*.txt;sub/"), Some("secret*"), "sub/secret.bin", false)]
    #[case(Some("*.txt;sub/"), Some("secret*"), "sub/public.bin", true)]
    fn filter_decisions(
        #[case] include: Option<&str>,
        #[case] exclude: Option<&str>,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let filter = FileFilter::new(include, exclude).unwrap();
        assert_eq!(filter.is_included(&p(path)), expected, "{path}");
    }

    #[test]
    fn excluded_folders_are_pruned_at_any_depth() {
        let filter = FileFilter::new(None, Some(".git/;build/out/")).unwrap();
        assert!(filter.is_folder_excluded(&p(".git")));
        assert!(filter.is_folder_excluded(&p("nested/.git/objects")));
        assert!(filter.is_folder_excluded(&p("build/out")));
        assert!(!filter.is_folder_excluded(&p("src/build/out")));
        assert!(!filter.is_folder_excluded(&p("src")));
    }

    #[test]
    fn empty_exclude_list_still_accepts_all() {
        let filter = FileFilter::new(None, Some(" ; ")).unwrap();
        assert!(filter.is_accept_all());
    }

    #[test]
    fn empty_include_list_includes_nothing() {
        let filter = FileFilter::new(Some(""), None).unwrap();
        assert!(!filter.is_included(&p("a.txt")));
        assert!(!filter.is_accept_all());
    }

    #[test]
    fn invalid_glob_is_configuration_error() {
        assert!(matches!(
            FileFilter::new(Some("[unclosed"), None),
            Err(Error::Configuration { .. })
        ));
    }
}
