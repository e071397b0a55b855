//! Temporary source trees and directory snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempDir;

/// A temporary directory populated through a builder.
///
/// ```rust
/// use dep_test_utils::{SourceTree, snapshot};
///
/// let tree = SourceTree::new().file("a.txt", "a").file("sub/b.txt", "b");
/// assert_eq!(snapshot(tree.root()), ["a.txt", "sub/b.txt"]);
/// ```
pub struct SourceTree {
    temp_dir: TempDir,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap_or_else(|e| panic!("SourceTree: tempdir: {e}")),
        }
    }

    /// Add a text file, creating parent folders.
    pub fn file(self, relative: &str, content: &str) -> Self {
        self.bytes(relative, content.as_bytes().to_vec())
    }

    /// Add a binary file, creating parent folders.
    pub fn bytes(self, relative: &str, content: Vec<u8>) -> Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("SourceTree: create {}: {e}", parent.display()));
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("SourceTree: write {}: {e}", path.display()));
        self
    }

    /// Add an empty folder.
    pub fn dir(self, relative: &str) -> Self {
        let path = self.path(relative);
        fs::create_dir_all(&path)
            .unwrap_or_else(|e| panic!("SourceTree: create {}: {e}", path.display()));
        self
    }

    /// Overwrite a file and stamp it with `modified`.
    ///
    /// Incremental logic compares last-write times, so tests that change a
    /// file in place stamp it explicitly instead of sleeping.
    pub fn rewrite(&self, relative: &str, content: &str, modified: SystemTime) {
        let path = self.path(relative);
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("SourceTree: write {}: {e}", path.display()));
        self.set_mtime(relative, modified);
    }

    pub fn set_mtime(&self, relative: &str, modified: SystemTime) {
        let path = self.path(relative);
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .unwrap_or_else(|e| panic!("SourceTree: set mtime of {}: {e}", path.display()));
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root as a string, the form downloaders take their source in.
    pub fn root_str(&self) -> &str {
        self.root()
            .to_str()
            .unwrap_or_else(|| panic!("SourceTree: non UTF-8 temp path"))
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }
}

/// Sorted relative paths of every file below `root`, `/`-separated.
///
/// Folders are not listed. A missing root yields an empty snapshot.
pub fn snapshot(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry.path().strip_prefix(root).ok().map(|relative| {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
        })
        .collect();
    files.sort();
    files
}
