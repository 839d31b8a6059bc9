//! Recent commit history of the settings repository.

use chrono::{DateTime, TimeZone, Utc};
use git2::Repository;
use serde::Serialize;

use crate::{Result, helpers};

/// Information about a single commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    /// Short commit hash (7 characters)
    pub hash: String,

    /// First line of the commit message
    pub message: String,

    /// Commit author name
    pub author: String,

    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

/// Extract the last `max_count` commits reachable from HEAD.
///
/// Returns commits in reverse-chronological order (most recent first) and
/// an empty list before the first commit.
pub fn list_recent_commits(repo: &Repository, max_count: usize) -> Result<Vec<CommitInfo>> {
    let Some(head) = helpers::head_commit(repo)? else {
        return Ok(Vec::new());
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.push(head.id())?;
    revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

    let mut commits = Vec::with_capacity(max_count);
    for oid in revwalk.take(max_count) {
        let commit = repo.find_commit(oid?)?;
        let summary = commit.message().and_then(|m| m.lines().next()).unwrap_or("");
        commits.push(CommitInfo {
            hash: format!("{:.7}", commit.id()),
            message: summary.to_string(),
            author: commit.author().name().unwrap_or("Unknown").to_string(),
            timestamp: Utc
                .timestamp_opt(commit.time().seconds(), 0)
                .single()
                .unwrap_or_default(),
        });
    }

    Ok(commits)
}
