//! jsonrelay - replay the git history of tracked JSON files into a derived
//! repository.
//!
//! jsonrelay walks an origin repository's history for a fixed set of tracked
//! JSON files and replays it, commit by commit, into a destination
//! repository. Each origin revision's content is deep-merged into the
//! accumulated destination state, and every replayed origin commit produces
//! exactly one destination commit carrying a resume marker in its message.
//! Re-running against an unchanged origin is a no-op.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resume detection, commit replay, and run orchestration
//! - [`core`] - Domain types, configuration, and the pure deep-merge function
//! - [`vcs`] - Single interface for all version-control operations
//!
//! # Correctness Invariants
//!
//! jsonrelay maintains the following invariants:
//!
//! 1. An origin commit is replayed at most once; resume markers are unique
//!    per destination history
//! 2. Destination commits are created strictly oldest-first; replayed
//!    commit N's parent is always replayed commit N-1
//! 3. A tracked file's destination state is loaded at most once per run and
//!    only ever mutated through the deep merge
//! 4. Unreadable origin content never aborts a run; repository and
//!    filesystem failures always do

pub mod cli;
pub mod core;
pub mod engine;
pub mod vcs;
