//! Working tree / index / HEAD difference computation

use std::collections::BTreeSet;

use git2::{Repository, Status, StatusOptions};
use serde::Serialize;

use crate::Result;

/// Paths that differ between the working tree, the index and HEAD.
///
/// Every path lands in exactly one category. Precedence is conflicting,
/// removed, added, changed, modified, then untracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexDiff {
    /// Staged, absent from HEAD
    pub added: BTreeSet<String>,
    /// Staged with content different from HEAD
    pub changed: BTreeSet<String>,
    /// In HEAD, removed from the index
    pub removed: BTreeSet<String>,
    /// Working tree differs from the index (including deletions)
    pub modified: BTreeSet<String>,
    /// Unknown files
    pub untracked: BTreeSet<String>,
    /// Unknown directories, reported without descending
    pub untracked_folders: BTreeSet<String>,
    /// Unmerged index entries
    pub conflicting: BTreeSet<String>,
}

impl IndexDiff {
    /// True iff any of the six change categories is non-empty.
    pub fn diff(&self) -> bool {
        !(self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.untracked_folders.is_empty())
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicting.is_empty()
    }

    fn classify(&mut self, path: &str, status: Status) {
        let path = path.to_string();
        if status.is_conflicted() {
            self.conflicting.insert(path);
        } else if status.is_index_deleted() {
            self.removed.insert(path);
        } else if status.is_index_new() {
            self.added.insert(path);
        } else if status.intersects(
            Status::INDEX_MODIFIED | Status::INDEX_TYPECHANGE | Status::INDEX_RENAMED,
        ) {
            self.changed.insert(path);
        } else if status.intersects(
            Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_TYPECHANGE | Status::WT_RENAMED,
        ) {
            self.modified.insert(path);
        } else if status.is_wt_new() {
            match path.strip_suffix('/') {
                Some(folder) => {
                    self.untracked_folders.insert(folder.to_string());
                }
                None => {
                    self.untracked.insert(path);
                }
            }
        }
    }
}

/// Compute the difference between the working tree, the index and HEAD.
pub fn compute_index_diff(repo: &Repository) -> Result<IndexDiff> {
    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(false)
        .include_ignored(false)
        .exclude_submodules(true);

    let statuses = repo.statuses(Some(&mut options))?;
    let mut diff = IndexDiff::default();
    for entry in statuses.iter() {
        if let Some(path) = entry.path() {
            diff.classify(path, entry.status());
        }
    }

    tracing::trace!(
        added = diff.added.len(),
        changed = diff.changed.len(),
        removed = diff.removed.len(),
        modified = diff.modified.len(),
        untracked = diff.untracked.len(),
        "Computed index diff"
    );
    Ok(diff)
}
