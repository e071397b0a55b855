//! [`TestWorkspace`] for end-to-end `depman` scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary folder holding a project and, next to it, a file share.
///
/// ```rust,no_run
/// use dep_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.publish("libfoo", "1.0", &[("lib/foo.a", "foo")]);
/// ws.write_project(&[("libfoo", "1.0", "FileShare")]);
/// ws.assert_file_exists("project/component.toml");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        let ws = Self {
            temp_dir: TempDir::new().unwrap_or_else(|e| panic!("TestWorkspace: tempdir: {e}")),
        };
        fs::create_dir_all(ws.project()).unwrap_or_else(|e| panic!("TestWorkspace: project: {e}"));
        fs::create_dir_all(ws.share()).unwrap_or_else(|e| panic!("TestWorkspace: share: {e}"));
        ws
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Folder the project's `component.toml` lives in.
    pub fn project(&self) -> PathBuf {
        self.root().join("project")
    }

    /// File-share root components are published to.
    pub fn share(&self) -> PathBuf {
        self.root().join("share")
    }

    /// Write `content` to `relative` below the root, creating parents.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("TestWorkspace: create {}: {e}", parent.display()));
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("TestWorkspace: write {}: {e}", path.display()));
    }

    /// Publish a component version with payload files to the share.
    pub fn publish(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        for (relative, content) in files {
            self.write(&format!("share/{name}/{version}/{relative}"), content);
        }
        if files.is_empty() {
            fs::create_dir_all(self.share().join(name).join(version))
                .unwrap_or_else(|e| panic!("TestWorkspace: publish {name}: {e}"));
        }
    }

    /// Write a `component.toml` into a published component version.
    pub fn publish_definition(&self, name: &str, version: &str, deps: &[(&str, &str, &str)]) {
        self.write(
            &format!("share/{name}/{version}/component.toml"),
            &definition(Some((name, version)), deps),
        );
    }

    /// Write the project's `component.toml` and a `.depman/config.toml`
    /// pointing `FileShareRootPath` at the share.
    pub fn write_project(&self, deps: &[(&str, &str, &str)]) {
        self.write("project/component.toml", &definition(Some(("app", "1.0")), deps));
        let share = self.share().to_string_lossy().replace('\\', "/");
        let config = format!(
            "retry_attempts = 0\nretry_delay_ms = 0\n\n[defaults]\nFileShareRootPath = \"{share}\"\n"
        );
        self.write("project/.depman/config.toml", &config);
    }

    /// Panics unless `rel` exists below the workspace root.
    pub fn assert_file_exists(&self, rel: &str) {
        let path = self.root().join(rel);
        assert!(path.exists(), "{} should exist", path.display());
    }

    pub fn assert_file_not_exists(&self, rel: &str) {
        let path = self.root().join(rel);
        assert!(!path.exists(), "{} should not exist", path.display());
    }

    /// Panics unless the file at `rel` contains `needle`.
    pub fn assert_file_contains(&self, rel: &str, needle: &str) {
        let path = self.root().join(rel);
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("TestWorkspace: read {}: {e}", path.display()));
        assert!(text.contains(needle), "{} lacks {needle:?}:\n{text}", path.display());
    }
}

fn definition(identity: Option<(&str, &str)>, deps: &[(&str, &str, &str)]) -> String {
    let mut toml = String::new();
    if let Some((name, version)) = identity {
        toml.push_str(&format!("name = \"{name}\"\nversion = \"{version}\"\n"));
    }
    for (name, version, kind) in deps {
        toml.push_str(&format!(
            "\n[[dependency]]\nname = \"{name}\"\nversion = \"{version}\"\ntype = \"{kind}\"\n"
        ));
    }
    toml
}
