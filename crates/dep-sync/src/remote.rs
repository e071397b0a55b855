//! Remote repository capability and the shared remote fetch loop
//!
//! Version-control and Subversion engines differ only in how they pick the
//! version to fetch and what they record about the run. Listing, filtering,
//! the incremental rule and writing items are shared here.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use dep_fs::{NormalizedPath, io};
use dep_graph::Settings;
use rayon::prelude::*;

use crate::engine::{self, Tracker};
use crate::{Error, FileFilter, FolderMapping, FolderMappings, OperationType, Result, SyncOptions};

/// One file or folder below a listed remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Path relative to the listed folder
    pub path: NormalizedPath,
    pub is_folder: bool,
    /// Opaque change identifier (changeset, last-changed revision, blob id)
    pub change_id: String,
}

impl RemoteItem {
    pub fn file(path: impl Into<NormalizedPath>, change_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_folder: false,
            change_id: change_id.into(),
        }
    }

    pub fn folder(path: impl Into<NormalizedPath>) -> Self {
        Self {
            path: path.into(),
            is_folder: true,
            change_id: String::new(),
        }
    }
}

/// Client of a version-control or Subversion server.
///
/// Paths are server paths joined with `/`. Implementations must be usable
/// from several fetch workers at once.
pub trait RemoteRepository: Send + Sync {
    /// Name used in logs and backend errors.
    fn name(&self) -> &str;

    /// Recursively list the items below `path` at `version`.
    fn list_items(&self, path: &str, version: &str) -> Result<Vec<RemoteItem>>;

    /// Content of one file at `version`.
    fn fetch(&self, path: &str, version: &str) -> Result<Vec<u8>>;

    /// Pin a version selector (e.g. `HEAD`) to a concrete version.
    fn resolve_version(&self, path: &str, version: &str) -> Result<String>;

    /// Map a server folder to a local folder of the working copy.
    fn map_folder(&self, server_path: &str, local_path: &Path) -> Result<()>;

    /// Remove the mapping of a local folder.
    fn unmap_folder(&self, local_path: &Path) -> Result<()>;
}

/// Fetch one mapped folder of a remote source.
pub(crate) struct RemoteFetch<'r> {
    pub repository: &'r dyn RemoteRepository,
    pub version: &'r str,
    pub filter: &'r FileFilter,
    pub options: SyncOptions,
    pub parallel: bool,
    pub force: bool,
}

impl RemoteFetch<'_> {
    /// Server folder a mapping reads from.
    pub(crate) fn server_path(source: &str, mapping: &FolderMapping) -> String {
        engine::join_remote(source, mapping.source_offset.as_str())
    }

    /// Synchronize `server_path` into `destination`; returns fetched count.
    pub(crate) fn run(
        &self,
        server_path: &str,
        destination: &Path,
        tracker: &Tracker<'_>,
    ) -> Result<usize> {
        let robustness = self.options.robustness;
        let items: Vec<RemoteItem> = self
            .repository
            .list_items(server_path, self.version)
            .map_err(|e| match e {
                Error::NotFound { what } => Error::configuration(format!(
                    "download source {server_path} does not exist at {}: {what}",
                    self.version
                )),
                other => other,
            })?
            .into_iter()
            .filter(|item| !item.is_folder && self.filter.is_included(&item.path))
            .collect();
        tracing::debug!(
            backend = self.repository.name(),
            server_path,
            items = items.len(),
            "Listed remote items"
        );

        engine::ensure_dir(destination, tracker, robustness)?;
        let fetched = AtomicUsize::new(0);
        let fetch_one = |item: &RemoteItem| -> Result<()> {
            let target = item.path.under(destination);
            if !tracker.needs_fetch(&target, &item.change_id, self.force) {
                tracing::debug!(path = %target.display(), "Unchanged, skipping");
                return Ok(());
            }
            let content = self
                .repository
                .fetch(&engine::join_remote(server_path, item.path.as_str()), self.version)?;
            if let Some(parent) = target.parent() {
                engine::ensure_dir(parent, tracker, robustness)?;
            }
            io::write_file(&target, &content, robustness)?;
            tracker.record(&target, item.change_id.clone());
            fetched.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(path = %target.display(), change = %item.change_id, "Fetched");
            Ok(())
        };

        if self.parallel {
            let pool = engine::build_pool(self.options.max_parallel_fetches)?;
            pool.install(|| items.par_iter().try_for_each(fetch_one))?;
        } else {
            items.iter().try_for_each(fetch_one)?;
        }
        Ok(fetched.into_inner())
    }
}

/// Filter and mappings of a remote download, after validating its inputs.
pub(crate) fn prepare(
    source: &str,
    destination: &Path,
    settings: &Settings,
) -> Result<(FileFilter, FolderMappings)> {
    engine::validate_endpoints(source, destination)?;
    if OperationType::from_settings(settings)? == OperationType::Move {
        return Err(Error::configuration("OperationType Move needs a local source"));
    }
    Ok((
        FileFilter::from_settings(settings)?,
        FolderMappings::from_settings(settings)?,
    ))
}
