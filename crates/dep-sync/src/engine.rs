//! Building blocks shared by every sync engine

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use dep_fs::{RobustnessConfig, io};
use dep_graph::{SettingKey, Settings};

use crate::{Error, Result, Watermark};

/// Shared handle on the watermark of a running download.
///
/// Workers lock it for a single lookup or update, never across I/O.
pub(crate) struct Tracker<'a> {
    watermark: Mutex<&'a mut Watermark>,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(watermark: &'a mut Watermark) -> Self {
        Self {
            watermark: Mutex::new(watermark),
        }
    }

    fn lock(&self) -> MutexGuard<'_, &'a mut Watermark> {
        self.watermark.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the incremental rule to one destination item.
    pub(crate) fn needs_fetch(&self, destination: &Path, current: &str, force: bool) -> bool {
        let key = Watermark::key_for(destination);
        let stored = self.lock().state(&key).map(str::to_owned);
        needs_fetch(stored.as_deref(), current, destination, force)
    }

    /// Remember a fetched item.
    pub(crate) fn record(&self, destination: &Path, state: impl Into<String>) {
        let mut watermark = self.lock();
        watermark.update_state(Watermark::key_for(destination), state);
        watermark.add_artifact(destination);
    }

    /// Remember a directory the sync created.
    pub(crate) fn record_dir(&self, dir: &Path) {
        self.lock().add_artifact(dir);
    }

    pub(crate) fn set_tag(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().set_tag(name, value);
    }
}

/// Fetch iff forced, never seen, changed, or the local copy disappeared.
pub(crate) fn needs_fetch(
    stored: Option<&str>,
    current: &str,
    destination: &Path,
    force: bool,
) -> bool {
    force || stored != Some(current) || !destination.exists()
}

/// Opaque file-share state of a file: its last-write time.
pub(crate) fn timestamp_state(path: &Path) -> Result<String> {
    Ok(format_timestamp(io::last_write_time(path)?))
}

pub(crate) fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Create `dir` and its missing ancestors, recording each one created.
pub(crate) fn ensure_dir(
    dir: &Path,
    tracker: &Tracker<'_>,
    robustness: RobustnessConfig,
) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect();

    io::create_dir_all(dir, robustness)?;
    for created in missing {
        tracker.record_dir(&created);
    }
    Ok(())
}

/// Reject empty endpoints before touching anything.
pub(crate) fn validate_endpoints(source: &str, destination: &Path) -> Result<()> {
    if source.trim().is_empty() {
        return Err(Error::configuration("download source is empty"));
    }
    if destination.as_os_str().is_empty() {
        return Err(Error::configuration("download destination is empty"));
    }
    Ok(())
}

/// Read a setting that must be present and non-empty.
pub(crate) fn require_setting(settings: &Settings, key: SettingKey) -> Result<&str> {
    settings
        .get(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::configuration(format!("required setting {key} is missing")))
}

/// Join a remote path and a relative item path with `/`.
pub(crate) fn join_remote(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    match (root.is_empty(), relative.is_empty()) {
        (_, true) => root.to_string(),
        (true, false) => relative.to_string(),
        (false, false) => format!("{root}/{relative}"),
    }
}

pub(crate) fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = match err.into_io_error() {
        Some(source) => source,
        None => std::io::Error::other("filesystem loop"),
    };
    dep_fs::Error::io(path, source).into()
}

pub(crate) fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|index| format!("dep-sync-fetch-{index}"))
        .build()
        .map_err(|e| Error::configuration(format!("cannot start fetch workers: {e}")))
}

/// Delete every recorded artifact, deepest first.
///
/// Directories are only removed when empty and stay recorded otherwise.
/// Entries that are gone already, or that were removed, are forgotten
/// together with their state. A removal that keeps failing aborts the revert
/// with that entry and everything above it still recorded. Returns the number
/// of paths deleted.
pub(crate) fn revert_artifacts(
    watermark: &mut Watermark,
    robustness: RobustnessConfig,
) -> Result<usize> {
    let mut removed = 0;
    for artifact in watermark.artifacts_deepest_first() {
        let metadata = match fs::symlink_metadata(&artifact) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                watermark.forget_artifact(&artifact);
                continue;
            }
            Err(e) => return Err(dep_fs::Error::io(&artifact, e).into()),
        };

        if metadata.is_dir() {
            let is_empty = fs::read_dir(&artifact)
                .map_err(|e| dep_fs::Error::io(&artifact, e))?
                .next()
                .is_none();
            if !is_empty {
                // Still recorded, so a later revert can remove it once emptied
                tracing::debug!(
                    path = %artifact.display(),
                    "Directory not empty, leaving it in place"
                );
                continue;
            }
            io::with_retry(robustness, &artifact, || fs::remove_dir(&artifact))?;
        } else {
            io::with_retry(robustness, &artifact, || fs::remove_file(&artifact))?;
        }
        removed += 1;
        watermark.forget_artifact(&artifact);
    }
    Ok(removed)
}
