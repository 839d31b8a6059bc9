//! Conflict resolution strategies

use settings_git::{CannotResolve, ConflictResolver, MergeConflict, Resolution, Side};

/// Content marking a file as "keep my version".
pub const MARKER_ACCEPT_MY: &[u8] = b"__accept my__";

/// Content marking a file as "take their version".
pub const MARKER_ACCEPT_THEIRS: &[u8] = b"__accept theirs__";

/// Decides conflicts from marker content placed in either version.
///
/// A side whose content is one of the markers dictates the outcome:
/// mine being "accept my" or theirs being "accept theirs" keeps mine,
/// mine being "accept theirs" or theirs being "accept my" takes theirs.
/// Anything else stays unresolved, or fails the merge in strict mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerResolver {
    strict: bool,
}

impl MarkerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the whole merge when a conflict carries no marker.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    fn decide(conflict: &MergeConflict) -> Option<Resolution> {
        let mine = conflict.content(Side::Mine);
        let theirs = conflict.content(Side::Theirs);

        if mine == Some(MARKER_ACCEPT_MY) || theirs == Some(MARKER_ACCEPT_THEIRS) {
            Some(Resolution::AcceptMine)
        } else if mine == Some(MARKER_ACCEPT_THEIRS) || theirs == Some(MARKER_ACCEPT_MY) {
            Some(Resolution::AcceptTheirs)
        } else {
            None
        }
    }
}

impl ConflictResolver for MarkerResolver {
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> {
        conflicts
            .iter()
            .map(|conflict| match Self::decide(conflict) {
                Some(resolution) => Ok(resolution),
                None if self.strict => Err(CannotResolve::new(format!(
                    "no resolution marker in {}",
                    conflict.path
                ))),
                None => Ok(Resolution::Unresolved),
            })
            .collect()
    }
}

/// Resolves every conflict in favour of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferResolver(pub Side);

impl ConflictResolver for PreferResolver {
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> {
        Ok(conflicts.iter().map(|_| Resolution::from(self.0)).collect())
    }
}

/// Refuses to resolve anything, for runs without a user to ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefuseResolver;

impl ConflictResolver for RefuseResolver {
    fn resolve(&self, conflicts: &[MergeConflict]) -> Result<Vec<Resolution>, CannotResolve> {
        let paths: Vec<&str> = conflicts.iter().map(|c| c.path.as_str()).collect();
        Err(CannotResolve::new(format!(
            "conflicts need a decision: {}",
            paths.join(", ")
        )))
    }
}
