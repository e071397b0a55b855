//! Error types for dep-graph

/// Result type for dep-graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or constructing a graph
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid setting, unparseable value
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unknown validator/resolver, unresolved component or version
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The backing store could not be reached or refused access
    #[error("Cannot connect to {location}: {reason}")]
    Connection { location: String, reason: String },

    /// A component definition document could not be parsed
    #[error("Invalid component definition at {location}: {message}")]
    DefinitionParse { location: String, message: String },

    /// Filesystem error from dep-fs
    #[error(transparent)]
    Fs(#[from] dep_fs::Error),

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
}
