//! Git-backed repository manager for settings-sync
//!
//! Owns the local settings repository: staging content store writes,
//! committing, fetching, merging with pluggable conflict resolution,
//! pushing and hard resets. Everything git-specific stays behind the
//! [`RepositoryManager`] trait.

pub mod cancel;
pub mod commits;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod helpers;
pub mod manager;
pub mod provider;
pub mod upstream;

pub use cancel::CancellationToken;
pub use commits::CommitInfo;
pub use conflict::{CannotResolve, ConflictResolver, MergeConflict, Resolution, Side};
pub use diff::IndexDiff;
pub use error::{Error, Result};
pub use manager::{GitRepositoryManager, Identity};
pub use provider::{CommitOutcome, FetchOutcome, MergeOutcome, PushOutcome, RepositoryManager};
pub use upstream::UpstreamConfig;
