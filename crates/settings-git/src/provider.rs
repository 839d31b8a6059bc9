//! Repository manager contract

use serde::Serialize;
use settings_fs::{NormalizedPath, RelativePath, RoamingScope};

use crate::{
    CancellationToken, CommitInfo, ConflictResolver, IndexDiff, MergeConflict, Result,
    UpstreamConfig,
};

/// Result of [`RepositoryManager::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed { id: String },
    NothingToCommit,
}

/// Result of [`RepositoryManager::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The upstream branch exists and is now available locally
    Fetched { commit: String },
    /// The upstream has no commits on the configured branch yet
    UpstreamEmpty,
}

/// Result of merging fetched upstream state into the local branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    UpToDate,
    FastForward { commit: String },
    Merged { commit: String, resolved: Vec<String> },
}

/// Result of [`RepositoryManager::push`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed { commit: String },
    /// Nothing local to push
    UpToDate,
    /// The upstream moved on; fetch and merge before retrying
    Rejected { reason: String },
}

/// Backend-agnostic operations the sync orchestrator needs.
///
/// Implementations own one local repository whose working tree is the
/// settings root, plus at most one upstream.
pub trait RepositoryManager: Send {
    /// Root of the working tree.
    fn work_tree(&self) -> &NormalizedPath;

    /// Write a settings file and stage it.
    fn save(&self, path: &str, content: &[u8], scope: RoamingScope) -> Result<RelativePath>;

    /// Delete a file or directory (the empty path is the whole root) and
    /// stage the removal.
    fn delete(&self, path: &str, scope: RoamingScope) -> Result<Vec<RelativePath>>;

    /// Read a settings file from the working tree.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    fn upstream(&self) -> Result<Option<UpstreamConfig>>;

    /// Point the manager at an upstream. `remote_branch` defaults to `master`.
    fn set_upstream(&self, url: &str, remote_branch: Option<&str>) -> Result<()>;

    fn clear_upstream(&self) -> Result<()>;

    /// Current commit id, `None` before the first commit.
    fn head(&self) -> Result<Option<String>>;

    fn index_diff(&self) -> Result<IndexDiff>;

    /// Stage everything and commit. No-op when nothing changed.
    fn commit(&self, message: &str) -> Result<CommitOutcome>;

    /// Commit an empty tree on top of HEAD and clear the working tree.
    fn commit_empty(&self, message: &str) -> Result<String>;

    fn fetch(&self, cancel: &CancellationToken) -> Result<FetchOutcome>;

    /// Merge a fetched commit into the local branch.
    fn merge(&self, fetched: &str, resolver: &dyn ConflictResolver) -> Result<MergeOutcome>;

    /// Fetch and merge. An empty upstream leaves the local state untouched.
    fn pull(
        &self,
        resolver: &dyn ConflictResolver,
        cancel: &CancellationToken,
    ) -> Result<MergeOutcome> {
        match self.fetch(cancel)? {
            FetchOutcome::Fetched { commit } => self.merge(&commit, resolver),
            FetchOutcome::UpstreamEmpty => Ok(MergeOutcome::UpToDate),
        }
    }

    /// Push the local branch. `force` replaces the upstream history.
    fn push(&self, force: bool, cancel: &CancellationToken) -> Result<PushOutcome>;

    /// Forced reset of branch, index and working tree. `None` resets to an
    /// empty repository without commits.
    fn reset_hard(&self, target: Option<&str>) -> Result<()>;

    /// True while a merge is waiting for conflicts to be resolved.
    fn is_merging(&self) -> Result<bool>;

    /// Conflicts of the unfinished merge, ordered by path.
    fn pending_conflicts(&self) -> Result<Vec<MergeConflict>>;

    /// Resolve the remaining conflicts of an unfinished merge and commit it.
    fn resolve_pending(&self, resolver: &dyn ConflictResolver) -> Result<MergeOutcome>;

    /// Drop an unfinished merge, restoring the last commit.
    fn abort_merge(&self) -> Result<()>;

    /// Most recent commits first.
    fn history(&self, max_count: usize) -> Result<Vec<CommitInfo>>;
}
