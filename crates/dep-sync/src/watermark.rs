//! Per-download incremental state and its persistent store
//!
//! A [`Watermark`] remembers, for one downloaded component, the last observed
//! state of every synchronized item and every path the sync created. The
//! [`WatermarkStore`] keeps one watermark per component identity in a JSON
//! document next to the materialized tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use dep_fs::path::native_depth;
use dep_fs::{ConfigStore, NormalizedPath, RobustnessConfig};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Incremental state of one download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Watermark {
    /// Canonical name of the downloader that produced the state
    pub download_type: String,
    /// Free-form run information (resolved revision, folder mappings)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Absolute paths written or created by the last sync
    #[serde(default)]
    pub artifacts_to_clean: BTreeSet<PathBuf>,
    /// Item key to last-seen opaque state
    #[serde(default)]
    pub watermarks: BTreeMap<String, String>,
}

impl Watermark {
    pub fn new(download_type: impl Into<String>) -> Self {
        Self {
            download_type: download_type.into(),
            ..Default::default()
        }
    }

    /// Watermark key of a destination path.
    pub fn key_for(destination: &Path) -> String {
        NormalizedPath::new(destination).as_str().to_string()
    }

    pub fn state(&self, key: &str) -> Option<&str> {
        self.watermarks.get(key).map(String::as_str)
    }

    pub fn update_state(&mut self, key: impl Into<String>, state: impl Into<String>) {
        self.watermarks.insert(key.into(), state.into());
    }

    pub fn remove_state(&mut self, key: &str) -> Option<String> {
        self.watermarks.remove(key)
    }

    pub fn add_artifact(&mut self, path: impl Into<PathBuf>) {
        self.artifacts_to_clean.insert(path.into());
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(name.into(), value.into());
    }

    /// Artifacts ordered deepest first, so files go before their folders.
    pub fn artifacts_deepest_first(&self) -> Vec<PathBuf> {
        let mut artifacts: Vec<PathBuf> = self.artifacts_to_clean.iter().cloned().collect();
        artifacts.sort_by(|a, b| {
            native_depth(b)
                .cmp(&native_depth(a))
                .then_with(|| b.cmp(a))
        });
        artifacts
    }

    /// Forget an artifact together with the state recorded for it.
    pub fn forget_artifact(&mut self, path: &Path) {
        self.artifacts_to_clean.remove(path);
        self.watermarks.remove(&Self::key_for(path));
    }

    /// True when nothing remains to clean or compare against.
    pub fn is_empty(&self) -> bool {
        self.artifacts_to_clean.is_empty() && self.watermarks.is_empty()
    }
}

/// Watermarks of every downloaded component, keyed by `name@version`.
#[derive(Debug)]
pub struct WatermarkStore {
    path: NormalizedPath,
    config: ConfigStore,
    entries: BTreeMap<String, Watermark>,
}

impl WatermarkStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>, robustness: RobustnessConfig) -> Result<Self> {
        let path = NormalizedPath::new(path);
        let config = ConfigStore::with_robustness(robustness);
        let entries = config.load_or_default(&path)?;
        Ok(Self {
            path,
            config,
            entries,
        })
    }

    /// Store key of a component identity.
    pub fn key(name: &str, version: &str) -> String {
        format!("{name}@{version}")
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Watermark> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, watermark: Watermark) {
        self.entries.insert(key.into(), watermark);
    }

    pub fn remove(&mut self, key: &str) -> Option<Watermark> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the store atomically.
    pub fn save(&self) -> Result<()> {
        self.config.save(&self.path, &self.entries)?;
        tracing::debug!(path = %self.path, entries = self.entries.len(), "Saved watermark store");
        Ok(())
    }
}
