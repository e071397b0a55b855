//! The downloader contract every sync engine implements

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use dep_fs::RobustnessConfig;
use dep_graph::{SettingKey, Settings};
use crate::{Error, Result, Watermark};

/// Default size of the worker pool used for parallel fetches.
pub const DEFAULT_MAX_PARALLEL_FETCHES: usize = 4;

/// Materializes one component version into a destination folder.
///
/// Implementations are incremental: items whose observed state matches the
/// state in `watermark` are not fetched again, unless `force` is set or the
/// destination copy disappeared. Everything written is recorded in the
/// watermark so that [`Downloader::revert_download`] can undo it exactly.
pub trait Downloader: Send + Sync {
    /// Canonical name stored in [`Watermark::download_type`].
    fn download_type(&self) -> &str;

    /// Whether `source` may be a local directory the downloader reads from.
    fn supports_local_source(&self) -> bool {
        false
    }

    /// Synchronize `source` into `destination`.
    ///
    /// # Errors
    ///
    /// - `Configuration` for an empty source/destination, a missing source
    ///   or a missing/invalid setting
    /// - `Fs` when a transient failure outlives its retries
    /// - `Backend` when a remote call fails
    fn download(
        &self,
        source: &str,
        destination: &Path,
        watermark: &mut Watermark,
        force: bool,
        settings: &Settings,
    ) -> Result<()>;

    /// Remove every artifact the recorded downloads created.
    fn revert_download(&self, watermark: &mut Watermark) -> Result<()>;
}

/// Whether source items are copied or relocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationType {
    #[default]
    Copy,
    Move,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Move => "Move",
        }
    }

    /// Read `OperationType`; absent means [`OperationType::Copy`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings
            .get(SettingKey::OperationType)
            .map(str::parse::<Self>)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("copy") => Ok(Self::Copy),
            v if v.eq_ignore_ascii_case("move") => Ok(Self::Move),
            other => Err(Error::configuration(format!("unknown operation type '{other}'"))),
        }
    }
}

/// Knobs shared by every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub robustness: RobustnessConfig,
    pub max_parallel_fetches: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            robustness: RobustnessConfig::default(),
            max_parallel_fetches: DEFAULT_MAX_PARALLEL_FETCHES,
        }
    }
}
