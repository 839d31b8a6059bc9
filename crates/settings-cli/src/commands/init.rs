//! Init command implementation

use std::path::Path;

use colored::Colorize;
use settings_core::{RefuseResolver, SettingsSync};

use crate::error::Result;

/// Create (or reopen) the settings repository at `root`.
pub fn run_init(root: &Path, upstream: Option<&str>, branch: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(root)?;
    let existed = root.join(".git").exists();
    let sync = SettingsSync::open(root, RefuseResolver)?;

    if existed {
        println!(
            "{} Reinitialized settings repository in {}",
            "=>".blue().bold(),
            root.display()
        );
    } else {
        println!(
            "{} Initialized settings repository in {}",
            "=>".blue().bold(),
            root.display()
        );
    }

    if let Some(url) = upstream {
        sync.set_upstream(url, branch)?;
        println!("   {}: {}", "Upstream".dimmed(), url.cyan());
    }
    Ok(())
}
