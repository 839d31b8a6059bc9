//! Filesystem layer for settings-sync
//!
//! Provides the content store that maps logical settings paths to bytes on
//! disk, plus the path, atomic I/O and config helpers it is built on.

pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod scope;
pub mod store;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{NormalizedPath, RelativePath};
pub use scope::RoamingScope;
pub use store::ContentStore;
