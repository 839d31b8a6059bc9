//! Interactive conflict resolution
//!
//! Uses dialoguer for terminal-based selection, one prompt per conflicting file.

use colored::Colorize;
use dialoguer::Select;
use settings_git::{CannotResolve, ConflictResolver, MergeConflict, Resolution, Side};

const CHOICES: &[&str] = &["Keep mine", "Take theirs", "Decide later"];

/// Asks the user how to settle each conflict.
///
/// Fails with [`CannotResolve`] when no terminal is available, which leaves
/// the merge pending for a later run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveResolver;

impl InteractiveResolver {
    fn describe(conflict: &MergeConflict, side: Side) -> String {
        match conflict.content(side) {
            Some(content) => format!("{} bytes", content.len()),
            None => "deleted".to_string(),
        }
    }

    fn choice(index: usize) -> Resolution {
        match index {
            0 => Resolution::AcceptMine,
            1 => Resolution::AcceptTheirs,
            _ => Resolution::Unresolved,
        }
    }
}

impl ConflictResolver for InteractiveResolver {
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> {
        println!();
        println!("{} {} conflicting file(s)", "Merge:".bold(), conflicts.len());

        let mut resolutions = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            println!();
            println!("  {}", conflict.path.cyan());
            println!("    {}: {}", "mine".dimmed(), Self::describe(conflict, Side::Mine));
            println!("    {}: {}", "theirs".dimmed(), Self::describe(conflict, Side::Theirs));

            let index = Select::new()
                .with_prompt(format!("Resolve {}", conflict.path))
                .items(CHOICES)
                .default(0)
                .interact()
                .map_err(|e| CannotResolve::new(format!("cannot prompt: {e}")))?;
            resolutions.push(Self::choice(index));
        }
        Ok(resolutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_mapping() {
        assert_eq!(InteractiveResolver::choice(0), Resolution::AcceptMine);
        assert_eq!(InteractiveResolver::choice(1), Resolution::AcceptTheirs);
        assert_eq!(InteractiveResolver::choice(2), Resolution::Unresolved);
    }

    #[test]
    fn test_describe_deleted_side() {
        let conflict = MergeConflict {
            path: "remote.xml".to_string(),
            mine: None,
            theirs: Some(b"<a />".to_vec()),
            base: Some(b"<b />".to_vec()),
        };
        assert_eq!(InteractiveResolver::describe(&conflict, Side::Mine), "deleted");
        assert_eq!(InteractiveResolver::describe(&conflict, Side::Theirs), "5 bytes");
    }
}
