//! Status command implementation

use std::collections::BTreeSet;
use std::path::Path;

use colored::{ColoredString, Colorize};
use serde_json::json;
use settings_core::SyncState;
use settings_git::RepositoryManager;

use crate::error::Result;

/// Run the status command
pub fn run_status(root: &Path, json: bool) -> Result<()> {
    let sync = super::open(root)?;
    let upstream = sync.upstream()?;
    let state = sync.state();
    let head = sync.with_manager(|m| m.head())?;
    let diff = sync.index_diff()?;

    if json {
        let value = json!({
            "root": root.display().to_string(),
            "upstream": upstream,
            "state": state,
            "head": head,
            "changes": diff,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Settings Status".bold());
    println!();
    println!("{}:     {}", "Root".dimmed(), root.display());
    match &upstream {
        Some(upstream) => println!(
            "{}: {} ({})",
            "Upstream".dimmed(),
            upstream.url.cyan(),
            upstream.branch()
        ),
        None => println!("{}: {}", "Upstream".dimmed(), "(none)".dimmed()),
    }
    match &head {
        Some(head) => println!("{}:     {}", "Head".dimmed(), super::short(head)),
        None => println!("{}:     {}", "Head".dimmed(), "(no commits)".dimmed()),
    }
    if state == SyncState::ConflictPending {
        println!(
            "{}:    {} (run {})",
            "State".dimmed(),
            "conflicts pending".red().bold(),
            "settings-sync sync --interactive".cyan()
        );
    }
    println!();

    if !diff.diff() && !diff.has_conflicts() {
        println!("{}", "Nothing to commit".green());
        return Ok(());
    }

    println!("{}:", "Changes".bold());
    print_paths(&diff.conflicting, "!".red().bold(), "conflict");
    print_paths(&diff.added, "+".green(), "added");
    print_paths(&diff.changed, "~".yellow(), "changed");
    print_paths(&diff.removed, "-".red(), "removed");
    print_paths(&diff.modified, "~".yellow(), "modified");
    print_paths(&diff.untracked, "?".dimmed(), "untracked");
    print_paths(&diff.untracked_folders, "?".dimmed(), "untracked");
    Ok(())
}

fn print_paths(paths: &BTreeSet<String>, marker: ColoredString, label: &str) {
    for path in paths {
        println!("  {} {} ({})", marker, path, label.dimmed());
    }
}
