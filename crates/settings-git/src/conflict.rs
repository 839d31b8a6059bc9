//! Merge conflicts and the resolver plug point

use serde::{Deserialize, Serialize};

/// One side of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The local repository
    Mine,
    /// The fetched upstream state
    Theirs,
}

/// A file that could not be merged automatically.
///
/// `None` content means the file is absent on that side, so a
/// delete-versus-modify conflict has exactly one of `mine`/`theirs` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Path relative to the settings root
    pub path: String,
    pub mine: Option<Vec<u8>>,
    pub theirs: Option<Vec<u8>>,
    /// Common ancestor content
    pub base: Option<Vec<u8>>,
}

impl MergeConflict {
    pub fn content(&self, side: Side) -> Option<&[u8]> {
        match side {
            Side::Mine => self.mine.as_deref(),
            Side::Theirs => self.theirs.as_deref(),
        }
    }

    /// One side deleted the file while the other changed it.
    pub fn is_delete_modify(&self) -> bool {
        self.mine.is_none() != self.theirs.is_none()
    }
}

/// Outcome chosen for a single conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the local content (or the local deletion)
    AcceptMine,
    /// Keep the upstream content (or the upstream deletion)
    AcceptTheirs,
    /// Replace the file with explicit content
    Content(Vec<u8>),
    /// Leave the conflict in place
    Unresolved,
}

impl From<Side> for Resolution {
    fn from(side: Side) -> Self {
        match side {
            Side::Mine => Resolution::AcceptMine,
            Side::Theirs => Resolution::AcceptTheirs,
        }
    }
}

/// Raised by a resolver that refuses to decide, typically because it
/// runs without a user to ask.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CannotResolve {
    pub message: String,
}

impl CannotResolve {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decides conflicting paths during a merge.
///
/// Receives the conflicts ordered by path and returns one resolution per
/// conflict in the same order. Missing trailing entries count as
/// [`Resolution::Unresolved`].
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve>;
}

impl<F> ConflictResolver for F
where
    F: Fn(&[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> + Send + Sync,
{
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> {
        self(conflicts)
    }
}
