//! Engine configuration file

use std::path::{Path, PathBuf};
use std::time::Duration;

use dep_fs::{ConfigStore, NormalizedPath, RobustnessConfig};
use dep_graph::Settings;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_MAX_PARALLEL_FETCHES, Result, SyncOptions};

/// Default location of the watermark store, relative to the workspace.
pub const DEFAULT_WATERMARK_FILE: &str = ".depman/watermarks.json";

/// Knobs read from `.depman/config.toml`.
///
/// ```toml
/// max_parallel_fetches = 8
/// retry_attempts = 5
/// retry_delay_ms = 100
///
/// version_control_repository = "../server"
///
/// [defaults]
/// FileShareRootPath = "//share/components"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_parallel_fetches: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Watermark store location; relative paths resolve against the workspace
    pub watermark_file: PathBuf,
    /// Local repository serving version-control components
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_control_repository: Option<PathBuf>,
    /// Fallback settings applied to every component
    pub defaults: Settings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let robustness = RobustnessConfig::default();
        Self {
            max_parallel_fetches: DEFAULT_MAX_PARALLEL_FETCHES,
            retry_attempts: robustness.retry_attempts,
            retry_delay_ms: robustness.retry_delay.as_millis() as u64,
            watermark_file: PathBuf::from(DEFAULT_WATERMARK_FILE),
            version_control_repository: None,
            defaults: Settings::new(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, using defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ConfigStore::new().load_or_default(&NormalizedPath::new(path))?)
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            retry_attempts: self.retry_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            ..RobustnessConfig::default()
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            robustness: self.robustness(),
            max_parallel_fetches: self.max_parallel_fetches.max(1),
        }
    }

    /// Watermark store path resolved against `workspace`.
    pub fn watermark_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.watermark_file)
    }

    /// Version-control repository resolved against `workspace`.
    pub fn version_control_path(&self, workspace: &Path) -> Option<PathBuf> {
        self.version_control_repository
            .as_ref()
            .map(|path| workspace.join(path))
    }
}
