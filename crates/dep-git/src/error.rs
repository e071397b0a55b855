//! Error types for dep-git

/// Result type for dep-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a git repository
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Revision '{spec}' not found")]
    RevisionNotFound { spec: String },

    #[error("Path '{path}' not found at {revision}")]
    PathNotFound { path: String, revision: String },

    #[error("Path '{path}' at {revision} is not a {expected}")]
    WrongKind {
        path: String,
        revision: String,
        expected: &'static str,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RevisionNotFound { .. } | Self::PathNotFound { .. } => true,
            Self::Git(err) => err.code() == git2::ErrorCode::NotFound,
            Self::WrongKind { .. } => false,
        }
    }
}

impl From<Error> for dep_sync::Error {
    fn from(err: Error) -> Self {
        if err.is_not_found() {
            dep_sync::Error::not_found(err.to_string())
        } else {
            dep_sync::Error::backend("git", err.to_string())
        }
    }
}
