//! Sync configuration

use std::time::Duration;

use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use settings_fs::{ConfigStore, NormalizedPath};
use settings_git::Identity;

use crate::{Result, SyncPolicy};

/// File name of the sync configuration inside the git directory.
pub const CONFIG_FILE: &str = "settings-sync.toml";

/// Tunables for [`crate::SettingsSync`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pushes attempted per sync before giving up on a moving upstream
    pub max_push_attempts: u32,

    /// First delay between a rejected push and the retry, doubled each time
    pub retry_initial_interval_ms: u64,

    /// Message for commits of local changes
    pub commit_message: String,

    /// Commit author, falls back to the git configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,

    /// Policy used when none is given explicitly
    pub default_policy: SyncPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_push_attempts: 3,
            retry_initial_interval_ms: 50,
            commit_message: "Sync settings".to_string(),
            author_name: None,
            author_email: None,
            default_policy: SyncPolicy::Merge,
        }
    }
}

impl SyncConfig {
    /// Conventional location for a settings root: `<root>/.git/settings-sync.toml`.
    pub fn default_path(root: &NormalizedPath) -> NormalizedPath {
        root.join(".git").join(CONFIG_FILE)
    }

    /// Load from `path` (TOML, JSON or YAML by extension), defaults if absent.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load_or_default(path)?)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    /// Commit identity when both name and email are configured.
    pub fn identity(&self) -> Option<Identity> {
        match (&self.author_name, &self.author_email) {
            (Some(name), Some(email)) => Some(Identity {
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }

    /// Delay schedule between rejected pushes.
    pub fn push_backoff(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.retry_initial_interval_ms);
        ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            max_interval: initial.saturating_mul(16),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}
