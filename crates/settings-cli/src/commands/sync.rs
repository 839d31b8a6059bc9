//! Sync and pull command implementations

use std::path::Path;

use colored::Colorize;
use settings_core::{PreferResolver, RefuseResolver, SyncPolicy, SyncReport, SyncTarget};
use settings_git::{CancellationToken, ConflictResolver, MergeOutcome};

use crate::cli::Prefer;
use crate::error::{CliError, Result};
use crate::interactive::InteractiveResolver;

/// Options of the sync command.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub policy: Option<String>,
    pub prefer: Option<Prefer>,
    pub interactive: bool,
    pub json: bool,
}

impl SyncArgs {
    fn resolver(&self) -> Box<dyn ConflictResolver> {
        match (self.interactive, self.prefer) {
            (true, _) => Box::new(InteractiveResolver),
            (false, Some(prefer)) => Box::new(PreferResolver(prefer.into())),
            (false, None) => Box::new(RefuseResolver),
        }
    }
}

/// Run the sync command
pub fn run_sync(root: &Path, args: &SyncArgs) -> Result<()> {
    let sync = super::open(root)?;
    let policy = match &args.policy {
        Some(name) => name.parse::<SyncPolicy>()?,
        None => sync.config().default_policy,
    };
    let resolver = args.resolver();
    let target = SyncTarget::new("cli");

    let report = match sync.sync_with(policy, &target, resolver.as_ref(), &CancellationToken::new()) {
        Ok(report) => report,
        Err(e) if e.leaves_conflict_pending() => {
            return Err(CliError::user(format!(
                "{e}\nConflicts are pending; rerun with {} or {}",
                "--interactive".cyan(),
                "--prefer mine|theirs".cyan()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Run the pull command
pub fn run_pull(root: &Path) -> Result<()> {
    let sync = super::open(root)?;
    let outcome = sync.pull(&CancellationToken::new())?;
    print_merge(&outcome);
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.is_noop() {
        println!("{}", "Already in sync".green());
        return;
    }

    println!("{} Synced with policy {}", "=>".blue().bold(), report.policy.to_string().cyan());
    if let Some(id) = &report.committed {
        println!("   {}: {}", "Committed".dimmed(), super::short(id).yellow());
    }
    if let Some(outcome) = &report.merge {
        print_merge(outcome);
    }
    for path in &report.resolved {
        println!("   {} {} (resolved)", "!".yellow(), path);
    }
    if let Some(id) = &report.pushed {
        println!(
            "   {}: {} after {} attempt(s)",
            "Pushed".dimmed(),
            super::short(id).yellow(),
            report.push_attempts
        );
    }
}

fn print_merge(outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::UpToDate => println!("   {}", "Up to date".dimmed()),
        MergeOutcome::FastForward { commit } => {
            println!("   {}: {}", "Fast-forward".dimmed(), super::short(commit).yellow())
        }
        MergeOutcome::Merged { commit, resolved } => println!(
            "   {}: {} ({} conflict(s) resolved)",
            "Merged".dimmed(),
            super::short(commit).yellow(),
            resolved.len()
        ),
    }
}
