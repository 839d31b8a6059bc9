//! settings-sync CLI
//!
//! Command-line front end for synchronizing a settings directory with its
//! git upstream.

mod cli;
mod commands;
mod error;
mod interactive;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::SyncArgs;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "debug" } else { "warn" };
    if let Err(e) = settings_core::logging::init_with_default(directive) {
        eprintln!("{}: logging disabled: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!(verbose = cli.verbose, "Starting settings-sync");

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(cmd) => execute_command(root, cmd),
        None => {
            println!("{} Settings sync CLI", "settings-sync".green().bold());
            println!();
            println!("Run {} for available commands.", "settings-sync --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(root: PathBuf, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { upstream, branch } => {
            commands::run_init(&root, upstream.as_deref(), branch.as_deref())
        }
        Commands::Upstream { url, branch, clear } => {
            commands::run_upstream(&root, url.as_deref(), branch.as_deref(), clear)
        }
        Commands::Status { json } => commands::run_status(&root, json),
        Commands::Commit { message } => commands::run_commit(&root, message.as_deref()),
        Commands::Pull => commands::run_pull(&root),
        Commands::Sync {
            policy,
            prefer,
            interactive,
            json,
        } => commands::run_sync(
            &root,
            &SyncArgs {
                policy,
                prefer,
                interactive,
                json,
            },
        ),
        Commands::Log { count } => commands::run_log(&root, count),
    }
}
