//! core
//!
//! Domain types, configuration, and the pure deep-merge function.
//!
//! Everything here is synchronous and free of I/O except config loading;
//! the merge in particular is a pure function so the replay engine's
//! correctness arguments stay local.

pub mod config;
pub mod merge;
pub mod types;

pub use config::{ConfigError, Manifest, SyncConfig};
pub use merge::merge_onto;
pub use types::{Oid, TrackedPath, TypeError};
