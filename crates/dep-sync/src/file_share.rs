//! Engine for directory sources: file shares, build drops and local folders

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use dep_fs::{NormalizedPath, io};
use dep_graph::Settings;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::engine::{self, Tracker};
use crate::{
    Downloader, Error, FileFilter, FolderMappings, OperationType, Result, SyncOptions, Watermark,
};

/// Canonical name of the file-share downloader.
pub const FILE_SHARE: &str = "FileShare";

/// One file selected for synchronization.
struct FileItem {
    source: PathBuf,
    destination: PathBuf,
}

/// Copies or moves a directory tree, fetching only changed files.
///
/// The observed state of a file is its last-write time. Copies keep the
/// source timestamp so that a copy moved on later still compares equal.
#[derive(Debug, Clone)]
pub struct FileShareCopier {
    download_type: String,
    options: SyncOptions,
}

impl FileShareCopier {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            download_type: FILE_SHARE.to_string(),
            options,
        }
    }

    /// Report a different download type, e.g. for build drops.
    pub fn with_download_type(mut self, download_type: impl Into<String>) -> Self {
        self.download_type = download_type.into();
        self
    }

    /// Collect the files of `root` the filter accepts, pruning excluded folders.
    fn collect(
        &self,
        root: &Path,
        destination: &Path,
        filter: &FileFilter,
    ) -> Result<Vec<FileItem>> {
        let mut items = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir()
                    || NormalizedPath::relative_to(root, entry.path())
                        .is_none_or(|rel| !filter.is_folder_excluded(&rel))
            });

        for entry in walker {
            let entry = entry.map_err(|e| engine::walk_error(root, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = NormalizedPath::relative_to(root, entry.path()) else {
                continue;
            };
            if filter.is_included(&relative) {
                items.push(FileItem {
                    source: entry.into_path(),
                    destination: relative.under(destination),
                });
            }
        }
        Ok(items)
    }

    fn copy_tree(
        &self,
        source: &Path,
        destination: &Path,
        filter: &FileFilter,
        tracker: &Tracker<'_>,
        force: bool,
    ) -> Result<usize> {
        let items = self.collect(source, destination, filter)?;
        let robustness = self.options.robustness;
        let fetched = AtomicUsize::new(0);

        engine::ensure_dir(destination, tracker, robustness)?;
        let pool = engine::build_pool(self.options.max_parallel_fetches)?;
        pool.install(|| {
            items.par_iter().try_for_each(|item| -> Result<()> {
                let state = engine::timestamp_state(&item.source)?;
                if !tracker.needs_fetch(&item.destination, &state, force) {
                    tracing::debug!(path = %item.destination.display(), "Unchanged, skipping");
                    return Ok(());
                }
                if let Some(parent) = item.destination.parent() {
                    engine::ensure_dir(parent, tracker, robustness)?;
                }
                io::copy_file(&item.source, &item.destination, robustness)?;
                tracker.record(&item.destination, state);
                fetched.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %item.destination.display(), "Copied");
                Ok(())
            })
        })?;
        Ok(fetched.into_inner())
    }

    /// Relocate `source` into `destination`.
    ///
    /// A subfolder absent at the destination is renamed wholesale when the
    /// filter accepts everything; otherwise folders are merged file by file.
    fn move_tree(
        &self,
        root: &Path,
        relative: &NormalizedPath,
        destination: &Path,
        filter: &FileFilter,
        tracker: &Tracker<'_>,
        force: bool,
    ) -> Result<usize> {
        let robustness = self.options.robustness;
        let source_dir = relative.under(root);
        let target_dir = relative.under(destination);
        if relative.is_empty() {
            engine::ensure_dir(&target_dir, tracker, robustness)?;
        }

        let mut entries: Vec<_> = fs::read_dir(&source_dir)
            .map_err(|e| dep_fs::Error::io(&source_dir, e))?
            .collect::<std::io::Result<_>>()
            .map_err(|e| dep_fs::Error::io(&source_dir, e))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut moved = 0;
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = relative.join(&name);
            let source_path = entry.path();
            let target_path = child.under(destination);

            if source_path.is_dir() {
                if filter.is_folder_excluded(&child) {
                    continue;
                }
                if filter.is_accept_all() && !target_path.exists() {
                    engine::ensure_dir(&target_dir, tracker, robustness)?;
                    io::rename_dir(&source_path, &target_path, robustness)?;
                    moved += record_tree(&target_path, tracker)?;
                    tracing::debug!(path = %target_path.display(), "Moved folder");
                } else {
                    moved += self.move_tree(root, &child, destination, filter, tracker, force)?;
                }
                continue;
            }

            if !filter.is_included(&child) {
                continue;
            }
            let state = engine::timestamp_state(&source_path)?;
            if !tracker.needs_fetch(&target_path, &state, force) {
                tracing::debug!(path = %target_path.display(), "Unchanged, skipping");
                continue;
            }
            engine::ensure_dir(&target_dir, tracker, robustness)?;
            io::move_file(&source_path, &target_path, robustness)?;
            tracker.record(&target_path, state);
            moved += 1;
            tracing::debug!(path = %target_path.display(), "Moved");
        }
        Ok(moved)
    }
}

/// Record a freshly renamed folder and everything below it.
fn record_tree(root: &Path, tracker: &Tracker<'_>) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| engine::walk_error(root, e))?;
        if entry.file_type().is_dir() {
            tracker.record_dir(entry.path());
        } else {
            tracker.record(entry.path(), engine::timestamp_state(entry.path())?);
            files += 1;
        }
    }
    Ok(files)
}

impl Downloader for FileShareCopier {
    fn download_type(&self) -> &str {
        &self.download_type
    }

    fn supports_local_source(&self) -> bool {
        true
    }

    fn download(
        &self,
        source: &str,
        destination: &Path,
        watermark: &mut Watermark,
        force: bool,
        settings: &Settings,
    ) -> Result<()> {
        engine::validate_endpoints(source, destination)?;
        let source = Path::new(source);
        if !source.is_dir() {
            return Err(Error::configuration(format!(
                "download source {} does not exist",
                source.display()
            )));
        }

        let filter = FileFilter::from_settings(settings)?;
        let mappings = FolderMappings::from_settings(settings)?;
        let operation = OperationType::from_settings(settings)?;

        watermark.download_type = self.download_type.clone();
        let tracker = Tracker::new(watermark);
        let mut fetched = 0;

        for mapping in mappings.effective() {
            let source_root = mapping.source_offset.under(source);
            let destination_root = mapping.local_offset.under(destination);
            if !source_root.is_dir() {
                return Err(Error::configuration(format!(
                    "mapped source folder {} does not exist",
                    source_root.display()
                )));
            }
            fetched += match operation {
                OperationType::Copy => {
                    self.copy_tree(&source_root, &destination_root, &filter, &tracker, force)?
                }
                OperationType::Move => self.move_tree(
                    &source_root,
                    &NormalizedPath::root(),
                    &destination_root,
                    &filter,
                    &tracker,
                    force,
                )?,
            };
        }

        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            %operation,
            fetched,
            "File share download finished"
        );
        Ok(())
    }

    fn revert_download(&self, watermark: &mut Watermark) -> Result<()> {
        let removed = engine::revert_artifacts(watermark, self.options.robustness)?;
        tracing::info!(removed, download_type = %self.download_type, "Reverted download");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dep_graph::SettingKey;
    use dep_test_utils::{SourceTree, snapshot};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn copier() -> FileShareCopier {
        FileShareCopier::new(SyncOptions {
            robustness: dep_fs::RobustnessConfig::no_retry(),
            max_parallel_fetches: 2,
        })
    }

    fn download(
        source: &SourceTree,
        destination: &Path,
        watermark: &mut Watermark,
        settings: &Settings,
    ) {
        copier()
            .download(source.root_str(), destination, watermark, false, settings)
            .unwrap();
    }

    #[test]
    fn copies_whole_tree_and_records_artifacts() {
        let source = SourceTree::new()
            .file("a.txt", "alpha")
            .file("sub/b.txt", "beta");
        let out = TempDir::new().unwrap();
        let dest = out.path().join("dest");
        let mut wm = Watermark::default();

        download(&source, &dest, &mut wm, &Settings::new());

        assert_eq!(snapshot(&dest), ["a.txt", "sub/b.txt"]);
        assert_eq!(wm.download_type, FILE_SHARE);
        assert!(wm.artifacts_to_clean.contains(&dest));
        assert!(wm.artifacts_to_clean.contains(&dest.join("sub")));
        assert_eq!(wm.watermarks.len(), 2);
    }

    #[test]
    fn second_run_fetches_nothing() {
        let source = SourceTree::new().file("a.txt", "alpha");
        let out = TempDir::new().unwrap();
        let mut wm = Watermark::default();

        download(&source, out.path(), &mut wm, &Settings::new());
        let first = wm.clone();
        fs::write(out.path().join("a.txt"), "locally edited").unwrap();
        download(&source, out.path(), &mut wm, &Settings::new());

        assert_eq!(wm, first);
        assert_eq!(fs::read_to_string(out.path().join("a.txt")).unwrap(), "locally edited");
    }

    #[test]
    fn deleted_destination_is_refetched() {
        let source = SourceTree::new().file("a.txt", "alpha");
        let out = TempDir::new().unwrap();
        let mut wm = Watermark::default();

        download(&source, out.path(), &mut wm, &Settings::new());
        fs::remove_file(out.path().join("a.txt")).unwrap();
        download(&source, out.path(), &mut wm, &Settings::new());

        assert_eq!(fs::read_to_string(out.path().join("a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn folder_include_filter_selects_subtree() {
        let source = SourceTree::new()
            .file("a.txt", "a")
            .file("sub/b.txt", "b")
            .file("sub/deep/c.txt", "c");
        let out = TempDir::new().unwrap();
        let settings = Settings::new().with(SettingKey::IncludeFilter, "sub\\");
        let mut wm = Watermark::default();

        download(&source, out.path(), &mut wm, &settings);

        assert_eq!(snapshot(out.path()), ["sub/b.txt", "sub/deep/c.txt"]);
    }

    #[test]
    fn folder_mappings_restrict_and_relocate() {
        let source = SourceTree::new()
            .file("bin/x.dll", "x")
            .file("docs/readme.md", "r")
            .file("src/main.c", "m");
        let out = TempDir::new().unwrap();
        let settings = Settings::new().with(
            SettingKey::FolderMappings,
            "sourceoffset=bin,localoffset=lib;sourceoffset=docs,localoffset=",
        );
        let mut wm = Watermark::default();

        download(&source, out.path(), &mut wm, &settings);

        assert_eq!(snapshot(out.path()), ["lib/x.dll", "readme.md"]);
    }

    #[test]
    fn missing_source_is_configuration_error() {
        let out = TempDir::new().unwrap();
        let err = copier()
            .download(
                out.path().join("nope").to_str().unwrap(),
                out.path(),
                &mut Watermark::default(),
                false,
                &Settings::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let err = copier()
            .download("", out.path(), &mut Watermark::default(), false, &Settings::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn move_renames_absent_folders_and_replaces_files() {
        let source = SourceTree::new()
            .file("new/a.txt", "a")
            .file("existing/b.txt", "fresh")
            .file("top.txt", "t");
        let out = TempDir::new().unwrap();
        fs::create_dir_all(out.path().join("existing")).unwrap();
        fs::write(out.path().join("existing/b.txt"), "stale").unwrap();
        fs::write(out.path().join("existing/keep.txt"), "k").unwrap();
        let settings = Settings::new().with(SettingKey::OperationType, "Move");
        let mut wm = Watermark::default();

        download(&source, out.path(), &mut wm, &settings);

        assert_eq!(
            snapshot(out.path()),
            ["existing/b.txt", "existing/keep.txt", "new/a.txt", "top.txt"]
        );
        assert_eq!(fs::read_to_string(out.path().join("existing/b.txt")).unwrap(), "fresh");
        assert!(!source.path("new").exists());
        assert!(wm.artifacts_to_clean.contains(&out.path().join("new")));
        assert!(wm.artifacts_to_clean.contains(&out.path().join("new/a.txt")));
        assert!(!wm.artifacts_to_clean.contains(&out.path().join("existing")));
    }

    #[test]
    fn revert_restores_pre_download_state() {
        let source = SourceTree::new()
            .file("a.txt", "a")
            .file("sub/deep/b.txt", "b");
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("mine.txt"), "not ours").unwrap();
        let before = snapshot(out.path());
        let mut wm = Watermark::default();

        download(&source, &out.path().join("dep"), &mut wm, &Settings::new());
        copier().revert_download(&mut wm).unwrap();

        assert_eq!(snapshot(out.path()), before);
        assert!(wm.is_empty());
    }
}
