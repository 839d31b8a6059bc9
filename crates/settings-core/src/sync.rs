//! Sync orchestration
//!
//! [`SettingsSync`] serializes every operation on the settings repository
//! behind one lock and drives a sync through its phases:
//!
//! ```text
//! Idle -> Committing -> Fetching -> Reconciling -> Pushing -> Idle
//!                                        |
//!                                        +-> ConflictPending
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use backoff::backoff::Backoff;
use serde::Serialize;
use settings_fs::{NormalizedPath, RelativePath, RoamingScope};
use settings_git::{
    CancellationToken, CommitInfo, CommitOutcome, ConflictResolver, FetchOutcome,
    GitRepositoryManager, IndexDiff, MergeOutcome, PushOutcome, RepositoryManager,
    UpstreamConfig,
};

use crate::{Error, PostPushHook, Result, SyncConfig, SyncPolicy};

/// Phase a [`SettingsSync`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Committing,
    Fetching,
    Reconciling,
    Pushing,
    /// A merge is waiting for its conflicts to be resolved
    ConflictPending,
}

/// Label for what is being synchronized, recorded in log spans only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget(String);

impl SyncTarget {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SyncTarget {
    fn default() -> Self {
        Self::new("application")
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one completed sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub policy: SyncPolicy,
    pub target: String,
    /// Commit created for local changes
    pub committed: Option<String>,
    /// Upstream commit fetched, `None` for an uninitialized upstream
    pub fetched: Option<String>,
    /// How fetched state was merged (merge policy only)
    pub merge: Option<MergeOutcome>,
    /// Commit now at the top of the upstream branch, if this sync pushed
    pub pushed: Option<String>,
    pub push_attempts: u32,
    /// Conflicting paths decided by the resolver
    pub resolved: Vec<String>,
}

impl SyncReport {
    fn new(policy: SyncPolicy, target: &SyncTarget) -> Self {
        Self {
            policy,
            target: target.to_string(),
            committed: None,
            fetched: None,
            merge: None,
            pushed: None,
            push_attempts: 0,
            resolved: Vec::new(),
        }
    }

    fn record_merge(&mut self, outcome: MergeOutcome) {
        if let MergeOutcome::Merged { resolved, .. } = &outcome {
            self.resolved.extend(resolved.iter().cloned());
        }
        self.merge = Some(outcome);
    }

    /// True when this sync changed nothing anywhere.
    pub fn is_noop(&self) -> bool {
        self.committed.is_none()
            && self.pushed.is_none()
            && matches!(self.merge, None | Some(MergeOutcome::UpToDate))
            && self.resolved.is_empty()
    }
}

/// Synchronizes one settings root against its upstream.
///
/// All operations lock the repository manager, so content writes issued
/// while a sync runs wait until it has finished.
pub struct SettingsSync<M> {
    manager: Mutex<M>,
    state: Mutex<SyncState>,
    resolver: Box<dyn ConflictResolver>,
    config: SyncConfig,
    post_push: Option<Box<dyn PostPushHook>>,
}

impl SettingsSync<GitRepositoryManager> {
    /// Open (or initialize) the git repository at `root` and load its
    /// sync configuration from `.git/settings-sync.toml`.
    pub fn open(
        root: impl Into<NormalizedPath>,
        resolver: impl ConflictResolver + 'static,
    ) -> Result<Self> {
        let manager = GitRepositoryManager::open_or_init(root)?;
        let config = SyncConfig::load(&SyncConfig::default_path(manager.work_tree()))?;
        let manager = match config.identity() {
            Some(identity) => manager.with_identity(identity),
            None => manager,
        };
        let state = initial_state(&manager)?;
        Ok(Self::build(manager, Box::new(resolver), state).with_config(config))
    }
}

fn initial_state<M: RepositoryManager>(manager: &M) -> settings_git::Result<SyncState> {
    Ok(if manager.is_merging()? {
        SyncState::ConflictPending
    } else {
        SyncState::Idle
    })
}

impl<M: RepositoryManager> SettingsSync<M> {
    /// Wrap a manager, resolving conflicts with `resolver` by default.
    ///
    /// A merge state that cannot be read is logged and treated as idle;
    /// [`SettingsSync::open`] reports it instead.
    pub fn new(manager: M, resolver: impl ConflictResolver + 'static) -> Self {
        let state = initial_state(&manager).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read merge state, assuming idle");
            SyncState::Idle
        });
        Self::build(manager, Box::new(resolver), state)
    }

    fn build(manager: M, resolver: Box<dyn ConflictResolver>, state: SyncState) -> Self {
        Self {
            manager: Mutex::new(manager),
            state: Mutex::new(state),
            resolver,
            config: SyncConfig::default(),
            post_push: None,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `hook` after every successful push.
    pub fn with_post_push(mut self, hook: impl PostPushHook + 'static) -> Self {
        self.post_push = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn lock(&self) -> MutexGuard<'_, M> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the repository manager.
    pub fn with_manager<T>(&self, f: impl FnOnce(&M) -> T) -> T {
        f(&self.lock())
    }

    /// Synchronize with the default resolver, waiting for a running sync.
    pub fn sync(&self, policy: SyncPolicy, target: &SyncTarget) -> Result<SyncReport> {
        self.sync_with(policy, target, self.resolver.as_ref(), &CancellationToken::new())
    }

    /// Synchronize with an explicit resolver and cancellation token.
    pub fn sync_with(
        &self,
        policy: SyncPolicy,
        target: &SyncTarget,
        resolver: &dyn ConflictResolver,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let manager = self.lock();
        self.run(&manager, policy, target, resolver, cancel)
    }

    /// Synchronize unless another sync is running.
    pub fn try_sync(
        &self,
        policy: SyncPolicy,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let manager = match self.manager.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(Error::SyncInProgress),
        };
        self.run(&manager, policy, target, self.resolver.as_ref(), cancel)
    }

    fn run(
        &self,
        manager: &M,
        policy: SyncPolicy,
        target: &SyncTarget,
        resolver: &dyn ConflictResolver,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let span = tracing::info_span!("sync", %policy, sync_target = %target);
        let _enter = span.enter();

        let mut report = SyncReport::new(policy, target);
        let result = match policy {
            SyncPolicy::Merge => self.merge(manager, resolver, cancel, &mut report),
            SyncPolicy::OverwriteLocal => self.overwrite_local(manager, cancel, &mut report),
            SyncPolicy::OverwriteRemote => self.overwrite_remote(manager, cancel, &mut report),
        };

        match result {
            Ok(()) => {
                self.set_state(SyncState::Idle);
                tracing::info!(
                    committed = report.committed.is_some(),
                    pushed = report.pushed.is_some(),
                    attempts = report.push_attempts,
                    resolved = report.resolved.len(),
                    "Sync finished"
                );
                Ok(report)
            }
            Err(e) => {
                if e.leaves_conflict_pending() {
                    self.set_state(SyncState::ConflictPending);
                    tracing::warn!(error = %e, "Sync stopped with unresolved conflicts");
                } else {
                    self.set_state(SyncState::Idle);
                    tracing::warn!(error = %e, "Sync failed");
                }
                Err(e)
            }
        }
    }

    fn commit_local(&self, manager: &M, report: &mut SyncReport) -> Result<()> {
        self.set_state(SyncState::Committing);
        if let CommitOutcome::Committed { id } = manager.commit(&self.config.commit_message)? {
            tracing::debug!(commit = %id, "Committed local changes");
            report.committed = Some(id);
        }
        Ok(())
    }

    fn fetch(&self, manager: &M, cancel: &CancellationToken, report: &mut SyncReport) -> Result<()> {
        self.set_state(SyncState::Fetching);
        report.fetched = match manager.fetch(cancel)? {
            FetchOutcome::Fetched { commit } => Some(commit),
            FetchOutcome::UpstreamEmpty => None,
        };
        Ok(())
    }

    fn merge(
        &self,
        manager: &M,
        resolver: &dyn ConflictResolver,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<()> {
        if manager.is_merging()? {
            self.set_state(SyncState::Reconciling);
            let outcome = manager.resolve_pending(resolver)?;
            report.record_merge(outcome);
        }

        self.commit_local(manager, report)?;
        self.fetch(manager, cancel, report)?;
        self.merge_fetched(manager, resolver, report)?;

        let mut backoff = self.config.push_backoff();
        loop {
            let head = manager.head()?;
            if head.is_none() || head == report.fetched {
                tracing::debug!("Upstream already has local state, nothing to push");
                return Ok(());
            }

            if cancel.is_cancelled() {
                return Err(cancelled("push"));
            }
            self.set_state(SyncState::Pushing);
            report.push_attempts += 1;
            match manager.push(false, cancel)? {
                PushOutcome::Pushed { commit } => return self.pushed(manager, commit, report),
                PushOutcome::UpToDate => return Ok(()),
                PushOutcome::Rejected { reason } => {
                    if report.push_attempts >= self.config.max_push_attempts {
                        return Err(Error::PushRejected {
                            attempts: report.push_attempts,
                        });
                    }
                    let delay = backoff.next_backoff().unwrap_or_default();
                    tracing::warn!(
                        attempt = report.push_attempts,
                        reason = %reason,
                        delay_ms = delay.as_millis() as u64,
                        "Push rejected, merging upstream before retrying"
                    );
                    std::thread::sleep(delay);
                    self.fetch(manager, cancel, report)?;
                    self.merge_fetched(manager, resolver, report)?;
                }
            }
        }
    }

    fn merge_fetched(
        &self,
        manager: &M,
        resolver: &dyn ConflictResolver,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Some(fetched) = report.fetched.clone() else {
            return Ok(());
        };
        self.set_state(SyncState::Reconciling);
        let outcome = manager.merge(&fetched, resolver)?;
        tracing::debug!(outcome = ?outcome, "Merged upstream");
        report.record_merge(outcome);
        Ok(())
    }

    fn overwrite_local(
        &self,
        manager: &M,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<()> {
        manager.abort_merge()?;
        self.commit_local(manager, report)?;
        self.fetch(manager, cancel, report)?;

        self.set_state(SyncState::Reconciling);
        manager.reset_hard(report.fetched.as_deref())?;
        tracing::debug!(commit = ?report.fetched, "Reset local settings to upstream");
        Ok(())
    }

    fn overwrite_remote(
        &self,
        manager: &M,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<()> {
        manager.abort_merge()?;
        self.commit_local(manager, report)?;
        self.fetch(manager, cancel, report)?;

        if manager.head()?.is_none() {
            let Some(fetched) = report.fetched.as_deref() else {
                return Ok(());
            };
            // Upstream history stays, its latest commit becomes the empty tree
            manager.reset_hard(Some(fetched))?;
            let id = manager.commit_empty(&self.config.commit_message)?;
            report.committed = Some(id);
        }

        if cancel.is_cancelled() {
            return Err(cancelled("push"));
        }
        self.set_state(SyncState::Pushing);
        report.push_attempts += 1;
        match manager.push(true, cancel)? {
            PushOutcome::Pushed { commit } => self.pushed(manager, commit, report),
            PushOutcome::UpToDate => Ok(()),
            PushOutcome::Rejected { reason } => {
                tracing::warn!(reason = %reason, "Forced push rejected");
                Err(Error::PushRejected {
                    attempts: report.push_attempts,
                })
            }
        }
    }

    fn pushed(&self, manager: &M, commit: String, report: &mut SyncReport) -> Result<()> {
        tracing::debug!(commit = %commit, "Pushed to upstream");
        if let Some(hook) = &self.post_push
            && let Some(upstream) = manager.upstream()?
        {
            hook.after_push(&upstream, &commit)?;
        }
        report.pushed = Some(commit);
        Ok(())
    }

    /// Save a settings file, waiting for a running sync.
    pub fn save(&self, path: &str, content: &[u8], scope: RoamingScope) -> Result<RelativePath> {
        Ok(self.lock().save(path, content, scope)?)
    }

    /// Delete a settings file or directory, waiting for a running sync.
    pub fn delete(&self, path: &str, scope: RoamingScope) -> Result<Vec<RelativePath>> {
        Ok(self.lock().delete(path, scope)?)
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().read(path)?)
    }

    pub fn set_upstream(&self, url: &str, remote_branch: Option<&str>) -> Result<()> {
        Ok(self.lock().set_upstream(url, remote_branch)?)
    }

    pub fn clear_upstream(&self) -> Result<()> {
        Ok(self.lock().clear_upstream()?)
    }

    pub fn upstream(&self) -> Result<Option<UpstreamConfig>> {
        Ok(self.lock().upstream()?)
    }

    /// Commit local changes without syncing.
    pub fn commit(&self, message: Option<&str>) -> Result<CommitOutcome> {
        let message = message.unwrap_or(&self.config.commit_message);
        Ok(self.lock().commit(message)?)
    }

    /// Fetch and merge without pushing.
    pub fn pull(&self, cancel: &CancellationToken) -> Result<MergeOutcome> {
        Ok(self.lock().pull(self.resolver.as_ref(), cancel)?)
    }

    pub fn index_diff(&self) -> Result<IndexDiff> {
        Ok(self.lock().index_diff()?)
    }

    pub fn history(&self, max_count: usize) -> Result<Vec<CommitInfo>> {
        Ok(self.lock().history(max_count)?)
    }
}

fn cancelled(phase: &str) -> Error {
    Error::Git(settings_git::Error::Cancelled {
        phase: phase.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_noop() {
        let mut report = SyncReport::new(SyncPolicy::Merge, &SyncTarget::default());
        assert!(report.is_noop());

        report.merge = Some(MergeOutcome::UpToDate);
        assert!(report.is_noop());

        report.pushed = Some("abc".into());
        assert!(!report.is_noop());
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let mut report = SyncReport::new(SyncPolicy::OverwriteRemote, &SyncTarget::new("project"));
        report.record_merge(MergeOutcome::Merged {
            commit: "abc".into(),
            resolved: vec!["remote.xml".into()],
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["policy"], "overwrite-remote");
        assert_eq!(json["target"], "project");
        assert_eq!(json["merge"]["outcome"], "merged");
        assert_eq!(json["resolved"][0], "remote.xml");
    }
}
