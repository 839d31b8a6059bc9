//! Error types for settings-git

/// Result type for settings-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in settings-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] settings_fs::Error),

    #[error("No upstream configured. Set one with `set_upstream` first.")]
    NoUpstream,

    #[error("Invalid branch name: {name}")]
    InvalidBranchName { name: String },

    #[error("Repository is in unmerged state, resolve conflicts first: {}", .paths.join(", "))]
    UnmergedState { paths: Vec<String> },

    #[error("Unresolved merge conflicts: {}", .paths.join(", "))]
    UnresolvedConflict { paths: Vec<String> },

    #[error("Uncommitted local changes would be overwritten, commit them first: {message}")]
    UncommittedChanges { message: String },

    #[error("Cannot resolve conflicts in automated mode: {message}")]
    CannotResolveInAutomatedMode { message: String },

    #[error("Operation cancelled before {phase}")]
    Cancelled { phase: String },

    #[error("Fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },
}

impl Error {
    pub(crate) fn cancelled(phase: &str) -> Self {
        Self::Cancelled {
            phase: phase.to_string(),
        }
    }

    /// True when the repository was left with an unfinished merge.
    pub fn leaves_conflict_pending(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedConflict { .. } | Error::CannotResolveInAutomatedMode { .. }
        )
    }
}
