//! vcs
//!
//! Single interface for all version-control operations.
//!
//! # Architecture
//!
//! This module is the only doorway to the repositories. The replay engine
//! consumes the [`Vcs`] capability trait and never touches `git2` or the
//! working tree directly; [`GitRepo`] is the real implementation and
//! [`MockVcs`] the in-memory one for tests.
//!
//! # Responsibilities
//!
//! - Log enumeration, optionally filtered to tracked paths
//! - Content reads at a specific revision
//! - Working-tree writes, staging, and commit creation
//!
//! # Invariants
//!
//! - Transient content conditions (path missing at a revision) are values,
//!   not errors; every [`VcsError`] is fatal to a run
//! - All operations cross the boundary with validated types
//!   ([`crate::core::types::Oid`], [`crate::core::types::TrackedPath`])

mod git;
mod mock;
mod traits;

pub use git::GitRepo;
pub use mock::{FailOn, MockOperation, MockVcs};
pub use traits::{CommitEntry, Vcs, VcsError};
