//! Upstream command implementation

use std::path::Path;

use colored::Colorize;

use crate::error::Result;

/// Show the upstream, or set/clear it.
pub fn run_upstream(root: &Path, url: Option<&str>, branch: Option<&str>, clear: bool) -> Result<()> {
    let sync = super::open(root)?;

    if clear {
        sync.clear_upstream()?;
        println!("{} Upstream removed", "=>".blue().bold());
        return Ok(());
    }

    if let Some(url) = url {
        sync.set_upstream(url, branch)?;
        println!("{} Upstream set to {}", "=>".blue().bold(), url.cyan());
        return Ok(());
    }

    match sync.upstream()? {
        Some(upstream) => println!("{} ({})", upstream.url, upstream.branch()),
        None => println!("{}", "No upstream configured".dimmed()),
    }
    Ok(())
}
