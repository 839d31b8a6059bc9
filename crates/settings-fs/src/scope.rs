//! Roaming scopes for settings files

use crate::{RelativePath, Result};

/// Where a settings file roams to.
///
/// Per-user files are shared by every machine syncing the repository.
/// Per-OS files live under an OS-specific directory such as `_mac/` so
/// that machines only exchange them with peers on the same platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoamingScope {
    #[default]
    PerUser,
    PerOs,
}

impl RoamingScope {
    /// Directory prefix for per-OS settings on the running platform.
    pub fn os_prefix() -> &'static str {
        if cfg!(target_os = "macos") {
            "_mac"
        } else if cfg!(target_os = "windows") {
            "_windows"
        } else if cfg!(target_os = "linux") {
            "_linux"
        } else if cfg!(target_os = "freebsd") {
            "_freebsd"
        } else {
            "_unix"
        }
    }

    /// Map a logical settings path to its location in the repository.
    pub fn resolve(&self, path: &str) -> Result<RelativePath> {
        let relative = RelativePath::parse(path)?;
        match self {
            RoamingScope::PerUser => Ok(relative),
            RoamingScope::PerOs => {
                let prefix = RelativePath::parse(Self::os_prefix())?;
                Ok(prefix.join(&relative))
            }
        }
    }
}
