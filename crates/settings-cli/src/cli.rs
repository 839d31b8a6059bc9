//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use settings_git::Side;

/// settings-sync - Keep a settings directory in sync with a git upstream
#[derive(Parser, Debug)]
#[command(name = "settings-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings root (defaults to the current directory)
    #[arg(short = 'C', long = "root", global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the settings repository
    ///
    /// Examples:
    ///   settings-sync init
    ///   settings-sync -C ~/.settings init --upstream git@host:me/settings.git
    Init {
        /// Upstream URL to configure right away
        #[arg(long)]
        upstream: Option<String>,

        /// Branch on the upstream
        #[arg(long, requires = "upstream")]
        branch: Option<String>,
    },

    /// Show, set or clear the upstream
    Upstream {
        /// New upstream URL
        url: Option<String>,

        /// Branch on the upstream
        #[arg(long, requires = "url")]
        branch: Option<String>,

        /// Remove the configured upstream
        #[arg(long, conflicts_with_all = ["url", "branch"])]
        clear: bool,
    },

    /// Show pending local changes and sync state
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Commit local changes
    Commit {
        /// Commit message (defaults to the configured one)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Fetch and merge the upstream without pushing
    Pull,

    /// Synchronize with the upstream
    ///
    /// Examples:
    ///   settings-sync sync                          # merge and push
    ///   settings-sync sync --policy overwrite-local  # take the upstream state
    ///   settings-sync sync --prefer theirs           # settle conflicts upstream's way
    Sync {
        /// merge, overwrite-local or overwrite-remote (defaults to the configured one)
        #[arg(short, long)]
        policy: Option<String>,

        /// Resolve every conflict in favour of one side
        #[arg(long, value_enum)]
        prefer: Option<Prefer>,

        /// Ask for each conflicting file
        #[arg(short, long, conflicts_with = "prefer")]
        interactive: bool,

        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent commits
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
}

/// Side taken by `sync --prefer`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    Mine,
    Theirs,
}

impl From<Prefer> for Side {
    fn from(prefer: Prefer) -> Self {
        match prefer {
            Prefer::Mine => Side::Mine,
            Prefer::Theirs => Side::Theirs,
        }
    }
}
