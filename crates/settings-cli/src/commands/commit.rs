//! Commit command implementation

use std::path::Path;

use colored::Colorize;
use settings_git::CommitOutcome;

use crate::error::Result;

/// Commit every local change.
pub fn run_commit(root: &Path, message: Option<&str>) -> Result<()> {
    let sync = super::open(root)?;

    match sync.commit(message)? {
        CommitOutcome::Committed { id } => {
            println!("{} Committed {}", "=>".blue().bold(), super::short(&id).yellow());
        }
        CommitOutcome::NothingToCommit => println!("{}", "Nothing to commit".dimmed()),
    }
    Ok(())
}
