//! Failures reported by the `settings-sync` binary

pub type Result<T> = std::result::Result<T, CliError>;

/// Everything a command can fail with. `main` prints the message and exits 1.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A sync failed: conflicts left pending, push rejected, sync in progress
    #[error(transparent)]
    Core(#[from] settings_core::Error),

    /// Repository access outside a sync, e.g. reading status or history
    #[error(transparent)]
    Git(#[from] settings_git::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `--json` output could not be rendered
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Bad invocation, such as conflicting flags or a missing upstream URL
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
