//! Shared test utilities for the settings-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`] - sample settings files
//! - [`tree`] - work tree snapshots and comparisons
//! - [`upstream`] - [`UpstreamFixture`], a bare upstream with a mirrored checkout

pub mod fixtures;
pub mod tree;
pub mod upstream;

pub use upstream::UpstreamFixture;
