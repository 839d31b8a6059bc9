//! Sync orchestration layer for settings-sync
//!
//! This crate drives one synchronization of the settings root against its
//! upstream, implementing:
//!
//! - **Sync policies**: merge, overwrite-local and overwrite-remote
//! - **Conflict resolvers**: marker based, side preference and refusal
//! - **Configuration**: push retry and commit identity settings
//! - **Post-push hooks**: reconciling a checkout of the upstream after a push
//!
//! # Architecture
//!
//! ```text
//!                 settings-cli
//!                      |
//!                settings-core
//!                      |
//!          +-----------+-----------+
//!          |                       |
//!     settings-fs            settings-git
//! ```
//!
//! # Example
//!
//! ```no_run
//! use settings_core::{MarkerResolver, SettingsSync, SyncPolicy, SyncTarget};
//!
//! fn example() -> settings_core::Result<()> {
//!     let sync = SettingsSync::open("/home/user/.settings-repository", MarkerResolver::strict())?;
//!     sync.set_upstream("https://github.com/user/settings.git", None)?;
//!     let report = sync.sync(SyncPolicy::Merge, &SyncTarget::default())?;
//!     println!("pushed: {:?}", report.pushed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod policy;
pub mod resolver;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use hooks::{PostPushHook, WorkTreeMirror};
pub use policy::SyncPolicy;
pub use resolver::{MARKER_ACCEPT_MY, MARKER_ACCEPT_THEIRS, MarkerResolver, PreferResolver, RefuseResolver};
pub use sync::{SettingsSync, SyncReport, SyncState, SyncTarget};
