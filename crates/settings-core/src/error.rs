//! Error types for settings-core

/// Result type for settings-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in settings-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown sync policy name
    #[error("Invalid sync policy: {policy} (expected merge, overwrite-local or overwrite-remote)")]
    InvalidPolicy { policy: String },

    /// The upstream kept rejecting pushes
    #[error("Push rejected by upstream after {attempts} attempts")]
    PushRejected { attempts: u32 },

    /// Another sync holds the repository
    #[error("A sync is already in progress")]
    SyncInProgress,

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from settings-fs
    #[error(transparent)]
    Fs(#[from] settings_fs::Error),

    /// Repository error from settings-git
    #[error(transparent)]
    Git(#[from] settings_git::Error),
}

impl Error {
    /// True when the repository was left with an unfinished merge.
    pub fn leaves_conflict_pending(&self) -> bool {
        matches!(self, Error::Git(e) if e.leaves_conflict_pending())
    }

    /// True when the sync stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Git(settings_git::Error::Cancelled { .. }))
    }
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Self {
        Error::Git(settings_git::Error::Git(e))
    }
}
