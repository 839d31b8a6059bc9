//! Shared git2 helper functions

use git2::build::CheckoutBuilder;
use git2::{
    Commit, Cred, CredentialType, ErrorCode, IndexEntry, Oid, RemoteCallbacks, Repository,
};

use crate::{CancellationToken, Result};

/// Get the commit HEAD points to, `None` on an unborn branch.
pub fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full name of the branch HEAD is attached to (born or not).
pub fn head_branch_ref(repo: &Repository) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    Ok(head
        .symbolic_target()
        .unwrap_or("refs/heads/master")
        .to_string())
}

/// Commits recorded in MERGE_HEAD by an unfinished merge.
pub fn merge_heads(repo: &Repository) -> Result<Vec<Oid>> {
    // mergehead_foreach needs a mutable handle
    let mut repo = Repository::open(repo.path())?;
    let mut heads = Vec::new();
    match repo.mergehead_foreach(|oid| {
        heads.push(*oid);
        true
    }) {
        Ok(()) => Ok(heads),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Force the working tree and index to match HEAD.
pub fn checkout_head_force(repo: &Repository, remove_untracked: bool) -> Result<()> {
    let mut checkout = CheckoutBuilder::new();
    checkout.force().remove_untracked(remove_untracked);
    repo.checkout_head(Some(&mut checkout))?;
    Ok(())
}

/// Load the blob behind a conflict stage.
pub fn entry_content(repo: &Repository, entry: Option<&IndexEntry>) -> Result<Option<Vec<u8>>> {
    match entry {
        Some(entry) => Ok(Some(repo.find_blob(entry.id)?.content().to_vec())),
        None => Ok(None),
    }
}

/// Callbacks for network operations.
///
/// Fetch progress observes the cancellation token; credentials come from
/// the SSH agent or the configured git credential helper.
pub fn remote_callbacks<'a>(cancel: &CancellationToken) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();

    let token = cancel.clone();
    callbacks.transfer_progress(move |_| !token.is_cancelled());

    callbacks.credentials(|url, username, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });

    callbacks
}
