//! Upstream remote configuration

use serde::{Deserialize, Serialize};

/// Name of the single remote the manager talks to.
pub const REMOTE_NAME: &str = "origin";

/// Branch used on the upstream when none is configured.
pub const DEFAULT_REMOTE_BRANCH: &str = "master";

/// Where settings are synchronized to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Remote URL or local path
    pub url: String,

    /// Branch on the upstream, `None` for the conventional default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_branch: Option<String>,
}

impl UpstreamConfig {
    pub fn new(url: impl Into<String>, remote_branch: Option<&str>) -> Self {
        Self {
            url: url.into(),
            remote_branch: remote_branch.map(String::from),
        }
    }

    /// Effective upstream branch name.
    pub fn branch(&self) -> &str {
        self.remote_branch.as_deref().unwrap_or(DEFAULT_REMOTE_BRANCH)
    }

    /// Full ref name of the branch on the upstream.
    pub fn remote_ref(&self) -> String {
        format!("refs/heads/{}", self.branch())
    }

    /// Local remote-tracking ref mirroring the upstream branch.
    pub fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", REMOTE_NAME, self.branch())
    }
}
