//! Failures surfaced by `depman` commands

pub type Result<T> = std::result::Result<T, CliError>;

/// Anything a command can fail with. `main` prints it and exits with 1.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Graph(#[from] dep_graph::Error),

    #[error(transparent)]
    Sync(#[from] dep_sync::Error),

    #[error(transparent)]
    Git(#[from] dep_git::Error),

    #[error(transparent)]
    Fs(#[from] dep_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Bad invocation or project layout, reported as-is.
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
