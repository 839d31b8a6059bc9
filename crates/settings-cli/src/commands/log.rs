//! Log command implementation

use std::path::Path;

use colored::Colorize;

use crate::error::Result;

/// Print the most recent `count` commits.
pub fn run_log(root: &Path, count: usize) -> Result<()> {
    let sync = super::open(root)?;
    let history = sync.history(count)?;

    if history.is_empty() {
        println!("{}", "No commits yet".dimmed());
        return Ok(());
    }

    for commit in history {
        println!(
            "{} {} {} {}",
            commit.hash.yellow(),
            commit.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            commit.author.cyan(),
            commit.message
        );
    }
    Ok(())
}
