//! Sync policies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// How a sync reconciles local and upstream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    /// Three-way merge, then push the result.
    ///
    /// Conflicts are handed to the resolver; the push is retried after
    /// another fetch and merge when the upstream moved on in between.
    #[default]
    Merge,

    /// Discard local state in favour of the upstream. Never pushes.
    #[serde(alias = "reset-to-theirs")]
    OverwriteLocal,

    /// Replace the upstream with local state via a forced push.
    #[serde(alias = "reset-to-my")]
    OverwriteRemote,
}

impl SyncPolicy {
    /// Check if this policy updates the upstream.
    pub fn pushes(&self) -> bool {
        !matches!(self, SyncPolicy::OverwriteLocal)
    }

    /// Check if this policy can run into merge conflicts.
    pub fn may_conflict(&self) -> bool {
        matches!(self, SyncPolicy::Merge)
    }

    /// Every policy name accepted by [`FromStr`].
    pub fn all_names() -> &'static [&'static str] {
        &["merge", "overwrite-local", "overwrite-remote"]
    }
}

impl FromStr for SyncPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "merge" => Ok(SyncPolicy::Merge),
            "overwrite-local" | "reset-to-theirs" => Ok(SyncPolicy::OverwriteLocal),
            "overwrite-remote" | "reset-to-my" => Ok(SyncPolicy::OverwriteRemote),
            _ => Err(Error::InvalidPolicy {
                policy: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPolicy::Merge => write!(f, "merge"),
            SyncPolicy::OverwriteLocal => write!(f, "overwrite-local"),
            SyncPolicy::OverwriteRemote => write!(f, "overwrite-remote"),
        }
    }
}
