//! In-memory [`RemoteRepository`] for dry runs and tests

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dep_fs::NormalizedPath;

use crate::{Error, RemoteItem, RemoteRepository, Result};

#[derive(Debug, Default)]
struct State {
    /// Server path to (content, change id)
    files: BTreeMap<String, (Vec<u8>, String)>,
    latest: Option<String>,
    mappings: Vec<(String, PathBuf)>,
}

/// A single-snapshot server holding files by server path.
///
/// `HEAD` and `T` resolve to the change id of the most recent [`put`].
///
/// [`put`]: MemoryRemote::put
#[derive(Debug, Default)]
pub struct MemoryRemote {
    name: String,
    state: Mutex<State>,
    fetches: AtomicUsize,
}

impl MemoryRemote {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a file.
    pub fn put(&self, path: &str, content: impl Into<Vec<u8>>, change_id: impl Into<String>) {
        let change_id = change_id.into();
        let mut state = self.lock();
        state.latest = Some(change_id.clone());
        state.files.insert(path.to_string(), (content.into(), change_id));
    }

    pub fn remove(&self, path: &str) {
        self.lock().files.remove(path);
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Active folder mappings in creation order.
    pub fn mappings(&self) -> Vec<(String, PathBuf)> {
        self.lock().mappings.clone()
    }
}

impl RemoteRepository for MemoryRemote {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_items(&self, path: &str, _version: &str) -> Result<Vec<RemoteItem>> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let state = self.lock();
        let mut folders = BTreeSet::new();
        let mut items = Vec::new();

        for (server_path, (_, change_id)) in &state.files {
            let Some(relative) = server_path.strip_prefix(&prefix) else {
                continue;
            };
            let relative = NormalizedPath::new(relative);
            let mut parent = relative.parent();
            while let Some(folder) = parent.filter(|p| !p.is_empty()) {
                parent = folder.parent();
                folders.insert(folder);
            }
            items.push(RemoteItem::file(relative, change_id.clone()));
        }

        if items.is_empty() && !state.files.contains_key(path) {
            return Err(Error::not_found(format!("{} on {}", path, self.name)));
        }
        items.extend(folders.into_iter().map(RemoteItem::folder));
        Ok(items)
    }

    fn fetch(&self, path: &str, _version: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .files
            .get(path)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| Error::not_found(format!("{} on {}", path, self.name)))
    }

    fn resolve_version(&self, _path: &str, version: &str) -> Result<String> {
        if version.eq_ignore_ascii_case("HEAD") || version.eq_ignore_ascii_case("T") {
            return self
                .lock()
                .latest
                .clone()
                .ok_or_else(|| Error::backend(&self.name, "repository is empty"));
        }
        Ok(version.to_string())
    }

    fn map_folder(&self, server_path: &str, local_path: &Path) -> Result<()> {
        let mut state = self.lock();
        state.mappings.retain(|(_, local)| local != local_path);
        state
            .mappings
            .push((server_path.to_string(), local_path.to_path_buf()));
        Ok(())
    }

    fn unmap_folder(&self, local_path: &Path) -> Result<()> {
        self.lock().mappings.retain(|(_, local)| local != local_path);
        Ok(())
    }
}
