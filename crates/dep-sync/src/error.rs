//! Error types for dep-sync

use std::path::PathBuf;

/// Result type for dep-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing a dependency
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing source, missing required setting, unparseable setting value
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unknown downloader name, missing remote item
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// An archive could not be read or its format is not handled
    #[error("Cannot extract archive {path}: {message}")]
    ArchiveFormat { path: PathBuf, message: String },

    /// A version-control or Subversion backend call failed
    #[error("Backend error from {backend}: {message}")]
    Backend { backend: String, message: String },

    /// Filesystem error from dep-fs, including exhausted retries
    #[error(transparent)]
    Fs(#[from] dep_fs::Error),

    /// Graph or settings error from dep-graph
    #[error(transparent)]
    Graph(#[from] dep_graph::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is a transient I/O condition that outlived its retries.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::Fs(dep_fs::Error::RetriesExhausted { .. }))
    }
}
