//! Command implementations for settings-cli

pub mod commit;
pub mod init;
pub mod log;
pub mod status;
pub mod sync;
pub mod upstream;

pub use commit::run_commit;
pub use init::run_init;
pub use log::run_log;
pub use status::run_status;
pub use sync::{SyncArgs, run_pull, run_sync};
pub use upstream::run_upstream;

use std::path::Path;

use settings_core::{RefuseResolver, SettingsSync};
use settings_git::GitRepositoryManager;

use crate::error::{CliError, Result};

/// Open an initialized settings root.
///
/// Conflicts met outside `sync` are refused and left pending.
pub(crate) fn open(root: &Path) -> Result<SettingsSync<GitRepositoryManager>> {
    if !root.join(".git").exists() {
        return Err(CliError::user(format!(
            "Not a settings repository: {} (run `settings-sync init`)",
            root.display()
        )));
    }
    Ok(SettingsSync::open(root, RefuseResolver)?)
}

/// Abbreviate a commit id for display.
pub(crate) fn short(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
