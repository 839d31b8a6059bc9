//! git2-backed repository manager

use std::cell::RefCell;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{
    Commit, ErrorCode, IndexAddOption, MergeOptions, Oid, PushOptions, Reference, Repository,
    RepositoryInitOptions, RepositoryState, ResetType, Signature,
};
use settings_fs::{ContentStore, NormalizedPath, RelativePath, RoamingScope};

use crate::upstream::REMOTE_NAME;
use crate::{
    CancellationToken, CommitInfo, CommitOutcome, ConflictResolver, Error, FetchOutcome,
    IndexDiff, MergeConflict, MergeOutcome, PushOutcome, RepositoryManager, Resolution, Result,
    UpstreamConfig, commits, diff, helpers,
};

/// Branch created by [`GitRepositoryManager::open_or_init`].
pub const LOCAL_BRANCH: &str = "master";

/// Author and committer used for sync commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "Settings Sync".into(),
            email: "settings-sync@localhost".into(),
        }
    }
}

/// Repository manager over a non-bare git repository at the settings root.
pub struct GitRepositoryManager {
    store: ContentStore,
    repo: Repository,
    identity: Option<Identity>,
}

impl GitRepositoryManager {
    /// Open the repository at `root`, initializing it if absent.
    pub fn open_or_init(root: impl Into<NormalizedPath>) -> Result<Self> {
        let store = ContentStore::open(root)?;
        let native = store.root().to_native();

        let repo = match Repository::open(&native) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                tracing::info!(path = %store.root(), "Initializing settings repository");
                let mut options = RepositoryInitOptions::new();
                options.initial_head(LOCAL_BRANCH);
                let repo = Repository::init_opts(&native, &options)?;
                // Settings are opaque bytes, never convert line endings
                repo.config()?.set_bool("core.autocrlf", false)?;
                repo
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            store,
            repo,
            identity: None,
        })
    }

    /// Use a fixed identity instead of the git configuration.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The underlying git repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    fn signature(&self) -> Result<Signature<'static>> {
        if let Some(identity) = &self.identity {
            return Ok(Signature::now(&identity.name, &identity.email)?);
        }
        match self.repo.signature() {
            Ok(signature) => Ok(signature.to_owned()),
            Err(_) => {
                let fallback = Identity::default();
                Ok(Signature::now(&fallback.name, &fallback.email)?)
            }
        }
    }

    fn conflict_paths(&self) -> Result<Vec<String>> {
        let index = self.repo.index()?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn move_branch(&self, target: Oid, log_message: &str) -> Result<()> {
        let branch = helpers::head_branch_ref(&self.repo)?;
        self.repo.reference(&branch, target, true, log_message)?;
        Ok(())
    }

    fn write_commit(&self, message: &str, tree_id: Oid, parents: &[Commit<'_>]) -> Result<Oid> {
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;
        Ok(oid)
    }

    fn apply_resolution(&self, conflict: &MergeConflict, resolution: Resolution) -> Result<()> {
        let content = match resolution {
            Resolution::AcceptMine => conflict.mine.clone(),
            Resolution::AcceptTheirs => conflict.theirs.clone(),
            Resolution::Content(bytes) => Some(bytes),
            Resolution::Unresolved => return Ok(()),
        };

        let relative = RelativePath::parse(&conflict.path)?;
        let path = Path::new(relative.as_str());
        let mut index = self.repo.index()?;
        index.conflict_remove(path)?;
        match content {
            Some(bytes) => {
                self.store.write(&relative, &bytes)?;
                index.add_path(path)?;
            }
            None => {
                self.store.remove(&relative)?;
                index.remove_path(path)?;
            }
        }
        index.write()?;
        tracing::debug!(path = %relative, "Applied conflict resolution");
        Ok(())
    }

    /// Resolve whatever conflicts the index holds, then conclude the merge.
    fn finish_merge(&self, resolver: &dyn ConflictResolver) -> Result<MergeOutcome> {
        let conflicts = self.pending_conflicts()?;
        let mut resolved = Vec::new();

        if !conflicts.is_empty() {
            tracing::debug!(count = conflicts.len(), "Delegating merge conflicts to resolver");
            let resolutions = resolver.resolve(&conflicts).map_err(|e| {
                Error::CannotResolveInAutomatedMode {
                    message: e.message,
                }
            })?;

            let mut resolutions = resolutions.into_iter();
            let mut unresolved = Vec::new();
            for conflict in &conflicts {
                match resolutions.next().unwrap_or(Resolution::Unresolved) {
                    Resolution::Unresolved => unresolved.push(conflict.path.clone()),
                    resolution => {
                        self.apply_resolution(conflict, resolution)?;
                        resolved.push(conflict.path.clone());
                    }
                }
            }

            if !unresolved.is_empty() {
                tracing::warn!(paths = ?unresolved, "Merge left with unresolved conflicts");
                return Err(Error::UnresolvedConflict { paths: unresolved });
            }
        }

        match self.commit("Merge upstream settings")? {
            CommitOutcome::Committed { id } => Ok(MergeOutcome::Merged {
                commit: id,
                resolved,
            }),
            CommitOutcome::NothingToCommit => Ok(MergeOutcome::UpToDate),
        }
    }

    /// Check out `target` without touching uncommitted work, then point the
    /// current branch at it.
    fn advance_to(&self, target: &Commit<'_>, log_message: &str) -> Result<()> {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(target.as_object(), Some(&mut checkout))
            .map_err(local_changes)?;
        self.move_branch(target.id(), log_message)
    }

    fn delete_reference(reference: Result<Reference<'_>>) -> Result<()> {
        match reference {
            Ok(mut reference) => Ok(reference.delete()?),
            Err(Error::Git(e)) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// The upstream has no ref matching the fetch refspec.
fn is_missing_remote_ref(error: &git2::Error) -> bool {
    error.code() == ErrorCode::NotFound || error.message().contains("couldn't find remote ref")
}

/// A checkout that would overwrite uncommitted work is refused by libgit2
/// with a conflict code.
fn local_changes(error: git2::Error) -> Error {
    if error.code() == ErrorCode::Conflict {
        Error::UncommittedChanges {
            message: error.message().to_string(),
        }
    } else {
        error.into()
    }
}

impl RepositoryManager for GitRepositoryManager {
    fn work_tree(&self) -> &NormalizedPath {
        self.store.root()
    }

    fn save(&self, path: &str, content: &[u8], scope: RoamingScope) -> Result<RelativePath> {
        let relative = self.store.save_in(scope, path, content)?;
        let mut index = self.repo.index()?;
        index.add_path(Path::new(relative.as_str()))?;
        index.write()?;
        Ok(relative)
    }

    fn delete(&self, path: &str, scope: RoamingScope) -> Result<Vec<RelativePath>> {
        let relative = scope.resolve(path)?;
        let removed = self.store.remove(&relative)?;

        let mut index = self.repo.index()?;
        if relative.is_root() {
            index.clear()?;
        } else {
            let target = Path::new(relative.as_str());
            index.remove_path(target)?;
            index.remove_dir(target, 0)?;
        }
        index.write()?;
        Ok(removed)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.read(path)?)
    }

    fn upstream(&self) -> Result<Option<UpstreamConfig>> {
        let remote = match self.repo.find_remote(REMOTE_NAME) {
            Ok(remote) => remote,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Some(url) = remote.url() else {
            return Ok(None);
        };

        let branch_key = format!(
            "branch.{}.merge",
            helpers::head_branch_ref(&self.repo)?.trim_start_matches("refs/heads/")
        );
        let config = self.repo.config()?.snapshot()?;
        let remote_branch = config
            .get_string(&branch_key)
            .ok()
            .and_then(|merge| merge.strip_prefix("refs/heads/").map(String::from));

        Ok(Some(UpstreamConfig {
            url: url.to_string(),
            remote_branch,
        }))
    }

    fn set_upstream(&self, url: &str, remote_branch: Option<&str>) -> Result<()> {
        if let Some(branch) = remote_branch
            && !Reference::is_valid_name(&format!("refs/heads/{}", branch))
        {
            return Err(Error::InvalidBranchName {
                name: branch.to_string(),
            });
        }

        match self.repo.find_remote(REMOTE_NAME) {
            Ok(_) => self.repo.remote_set_url(REMOTE_NAME, url)?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.repo.remote(REMOTE_NAME, url)?;
            }
            Err(e) => return Err(e.into()),
        }

        let local = helpers::head_branch_ref(&self.repo)?;
        let local = local.trim_start_matches("refs/heads/");
        let mut config = self.repo.config()?;
        config.set_str(&format!("branch.{}.remote", local), REMOTE_NAME)?;
        let merge_key = format!("branch.{}.merge", local);
        match remote_branch {
            Some(branch) => config.set_str(&merge_key, &format!("refs/heads/{}", branch))?,
            None => match config.remove(&merge_key) {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }

        tracing::info!(url, remote_branch, "Upstream configured");
        Ok(())
    }

    fn clear_upstream(&self) -> Result<()> {
        match self.repo.remote_delete(REMOTE_NAME) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let local = helpers::head_branch_ref(&self.repo)?;
        let local = local.trim_start_matches("refs/heads/");
        let mut config = self.repo.config()?;
        for key in ["remote", "merge"] {
            match config.remove(&format!("branch.{}.{}", local, key)) {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!("Upstream removed");
        Ok(())
    }

    fn head(&self) -> Result<Option<String>> {
        Ok(helpers::head_commit(&self.repo)?.map(|commit| commit.id().to_string()))
    }

    fn index_diff(&self) -> Result<IndexDiff> {
        diff::compute_index_diff(&self.repo)
    }

    fn commit(&self, message: &str) -> Result<CommitOutcome> {
        let conflicts = self.conflict_paths()?;
        if !conflicts.is_empty() {
            return Err(Error::UnmergedState { paths: conflicts });
        }

        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let head = helpers::head_commit(&self.repo)?;
        let merge_heads = helpers::merge_heads(&self.repo)?;
        let concluding_merge = !merge_heads.is_empty();

        if !concluding_merge {
            let unchanged = match &head {
                Some(commit) => commit.tree_id() == tree_id,
                None => index.is_empty(),
            };
            if unchanged {
                tracing::debug!("Nothing to commit");
                return Ok(CommitOutcome::NothingToCommit);
            }
        }

        let mut parents: Vec<Commit<'_>> = head.into_iter().collect();
        for oid in merge_heads {
            parents.push(self.repo.find_commit(oid)?);
        }

        let oid = self.write_commit(message, tree_id, &parents)?;
        if concluding_merge {
            self.repo.cleanup_state()?;
        }

        tracing::debug!(commit = %oid, parents = parents.len(), "Committed settings");
        Ok(CommitOutcome::Committed {
            id: oid.to_string(),
        })
    }

    fn commit_empty(&self, message: &str) -> Result<String> {
        let tree_id = self.repo.treebuilder(None)?.write()?;
        let parents: Vec<Commit<'_>> = helpers::head_commit(&self.repo)?.into_iter().collect();
        let oid = self.write_commit(message, tree_id, &parents)?;
        helpers::checkout_head_force(&self.repo, true)?;
        tracing::debug!(commit = %oid, "Committed empty settings tree");
        Ok(oid.to_string())
    }

    fn fetch(&self, cancel: &CancellationToken) -> Result<FetchOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("fetch"));
        }
        let upstream = self.upstream()?.ok_or(Error::NoUpstream)?;
        tracing::debug!(url = %upstream.url, branch = upstream.branch(), "Fetching upstream");

        // A stale tracking ref would hide an upstream that became empty
        Self::delete_reference(
            self.repo
                .find_reference(&upstream.tracking_ref())
                .map_err(Error::from),
        )?;

        let mut remote = self.repo.find_remote(REMOTE_NAME)?;
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(helpers::remote_callbacks(cancel));
        let refspec = format!("+{}:{}", upstream.remote_ref(), upstream.tracking_ref());
        match remote.fetch(&[&refspec], Some(&mut options), None) {
            Ok(()) => {}
            Err(_) if cancel.is_cancelled() => return Err(Error::cancelled("fetch")),
            Err(e) if is_missing_remote_ref(&e) => {}
            Err(e) => {
                return Err(Error::FetchFailed {
                    message: e.message().to_string(),
                });
            }
        }

        match self.repo.find_reference(&upstream.tracking_ref()) {
            Ok(reference) => Ok(FetchOutcome::Fetched {
                commit: reference.peel_to_commit()?.id().to_string(),
            }),
            Err(e) if e.code() == ErrorCode::NotFound => {
                tracing::info!(url = %upstream.url, "Upstream has no commits yet");
                Ok(FetchOutcome::UpstreamEmpty)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn merge(&self, fetched: &str, resolver: &dyn ConflictResolver) -> Result<MergeOutcome> {
        let their_oid = Oid::from_str(fetched)?;
        let theirs = self.repo.find_commit(their_oid)?;

        let Some(ours) = helpers::head_commit(&self.repo)? else {
            self.advance_to(&theirs, "merge: initialize from upstream")?;
            tracing::debug!(commit = %their_oid, "Initialized local branch from upstream");
            return Ok(MergeOutcome::FastForward {
                commit: fetched.to_string(),
            });
        };

        if ours.id() == their_oid || self.repo.graph_descendant_of(ours.id(), their_oid)? {
            return Ok(MergeOutcome::UpToDate);
        }

        if self.repo.graph_descendant_of(their_oid, ours.id())? {
            self.advance_to(&theirs, &format!("merge: fast-forward to {}", their_oid))?;
            tracing::debug!(commit = %their_oid, "Fast-forwarded to upstream");
            return Ok(MergeOutcome::FastForward {
                commit: fetched.to_string(),
            });
        }

        let annotated = self.repo.find_annotated_commit(theirs.id())?;
        let mut merge_options = MergeOptions::new();
        let mut checkout = CheckoutBuilder::new();
        checkout.allow_conflicts(true).conflict_style_merge(true);
        self.repo
            .merge(&[&annotated], Some(&mut merge_options), Some(&mut checkout))
            .map_err(local_changes)?;

        tracing::debug!(ours = %ours.id(), theirs = %their_oid, "Three-way merge started");
        self.finish_merge(resolver)
    }

    fn push(&self, force: bool, cancel: &CancellationToken) -> Result<PushOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("push"));
        }
        let upstream = self.upstream()?.ok_or(Error::NoUpstream)?;
        let Some(head) = helpers::head_commit(&self.repo)? else {
            return Ok(PushOutcome::UpToDate);
        };

        let local = helpers::head_branch_ref(&self.repo)?;
        let refspec = format!(
            "{}{}:{}",
            if force { "+" } else { "" },
            local,
            upstream.remote_ref()
        );
        tracing::debug!(refspec, url = %upstream.url, "Pushing settings");

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        {
            let mut callbacks = helpers::remote_callbacks(cancel);
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some(format!("{}: {}", refname, message));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            let mut remote = self.repo.find_remote(REMOTE_NAME)?;
            match remote.push(&[&refspec], Some(&mut options)) {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::NotFastForward => {
                    return Ok(PushOutcome::Rejected {
                        reason: e.message().to_string(),
                    });
                }
                Err(e) => {
                    return Err(Error::PushFailed {
                        message: e.message().to_string(),
                    });
                }
            }
        }

        if let Some(reason) = rejection.into_inner() {
            return Ok(PushOutcome::Rejected { reason });
        }

        self.repo.reference(
            &upstream.tracking_ref(),
            head.id(),
            true,
            "push: update remote-tracking ref",
        )?;
        Ok(PushOutcome::Pushed {
            commit: head.id().to_string(),
        })
    }

    fn reset_hard(&self, target: Option<&str>) -> Result<()> {
        self.repo.cleanup_state()?;
        let branch = helpers::head_branch_ref(&self.repo)?;

        match target {
            Some(id) => {
                let commit = self.repo.find_commit(Oid::from_str(id)?)?;
                self.move_branch(commit.id(), &format!("reset: hard reset to {}", commit.id()))?;
                self.repo.set_head(&branch)?;
                self.repo.reset(commit.as_object(), ResetType::Hard, None)?;
                // reset keeps untracked files
                helpers::checkout_head_force(&self.repo, true)?;
                tracing::debug!(commit = %commit.id(), "Hard reset local settings");
            }
            None => {
                Self::delete_reference(self.repo.find_reference(&branch).map_err(Error::from))?;
                self.repo.set_head(&branch)?;
                let mut index = self.repo.index()?;
                index.clear()?;
                index.write()?;
                self.store.remove(&RelativePath::root())?;
                tracing::debug!("Hard reset local settings to empty");
            }
        }
        Ok(())
    }

    fn is_merging(&self) -> Result<bool> {
        Ok(self.repo.state() == RepositoryState::Merge || self.repo.index()?.has_conflicts())
    }

    fn pending_conflicts(&self) -> Result<Vec<MergeConflict>> {
        let index = self.repo.index()?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut conflicts = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            let Some(entry) = entry else { continue };

            conflicts.push(MergeConflict {
                path: String::from_utf8_lossy(&entry.path).into_owned(),
                mine: helpers::entry_content(&self.repo, conflict.our.as_ref())?,
                theirs: helpers::entry_content(&self.repo, conflict.their.as_ref())?,
                base: helpers::entry_content(&self.repo, conflict.ancestor.as_ref())?,
            });
        }
        conflicts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(conflicts)
    }

    fn resolve_pending(&self, resolver: &dyn ConflictResolver) -> Result<MergeOutcome> {
        if !self.is_merging()? {
            return Ok(MergeOutcome::UpToDate);
        }
        tracing::info!("Resuming unfinished merge");
        self.finish_merge(resolver)
    }

    fn abort_merge(&self) -> Result<()> {
        if !self.is_merging()? {
            return Ok(());
        }
        match helpers::head_commit(&self.repo)? {
            Some(head) => {
                let mut checkout = CheckoutBuilder::new();
                checkout.force();
                self.repo
                    .reset(head.as_object(), ResetType::Hard, Some(&mut checkout))?;
            }
            None => {
                let mut index = self.repo.index()?;
                index.clear()?;
                index.write()?;
            }
        }
        self.repo.cleanup_state()?;
        tracing::info!("Aborted unfinished merge");
        Ok(())
    }

    fn history(&self, max_count: usize) -> Result<Vec<CommitInfo>> {
        commits::list_recent_commits(&self.repo, max_count)
    }
}
