//! Post-push hooks
//!
//! A push only moves the branch on the upstream. Hosts that keep a checkout
//! of the upstream register a [`PostPushHook`] to reconcile it afterwards.

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, ResetType};
use settings_git::UpstreamConfig;

use crate::Result;

/// Runs after every successful push of a sync.
pub trait PostPushHook: Send + Sync {
    /// `commit` is the id now at the top of the upstream branch.
    fn after_push(&self, upstream: &UpstreamConfig, commit: &str) -> Result<()>;
}

/// Hard-resets a work tree attached to a local upstream repository so it
/// shows the pushed branch.
#[derive(Debug, Clone)]
pub struct WorkTreeMirror {
    work_tree: PathBuf,
}

impl WorkTreeMirror {
    pub fn new(work_tree: impl Into<PathBuf>) -> Self {
        Self {
            work_tree: work_tree.into(),
        }
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }
}

impl PostPushHook for WorkTreeMirror {
    fn after_push(&self, upstream: &UpstreamConfig, commit: &str) -> Result<()> {
        let repo = Repository::open(&upstream.url)?;
        repo.set_workdir(&self.work_tree, false)?;
        repo.set_head(&upstream.remote_ref())?;

        let target = repo.find_commit(Oid::from_str(commit)?)?;
        repo.reset(target.as_object(), ResetType::Hard, None)?;
        // reset leaves untracked files behind
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.checkout_head(Some(&mut checkout))?;

        tracing::debug!(
            work_tree = %self.work_tree.display(),
            commit,
            "Mirrored upstream work tree"
        );
        Ok(())
    }
}
