//! vcs::traits
//!
//! Version-control accessor trait.
//!
//! # Design
//!
//! The [`Vcs`] trait is the capability surface the replay engine consumes:
//! log enumeration, content reads at a revision, worktree writes, staging,
//! and commit creation, each scoped to a single repository. The trait is
//! async because every method is an I/O round trip, and the engine fans
//! out per-file reads within one commit step.
//!
//! Two implementations exist: [`crate::vcs::GitRepo`] (git2-backed) and
//! [`crate::vcs::MockVcs`] (in-memory, for deterministic engine tests).
//!
//! # Example
//!
//! ```ignore
//! use jsonrelay::vcs::Vcs;
//!
//! async fn head_message(vcs: &dyn Vcs) -> Option<String> {
//!     let log = vcs.log(&[]).await.ok()?;
//!     log.first().map(|c| c.message.clone())
//! }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{Oid, TrackedPath, TypeError};

/// Errors from version-control operations.
///
/// Every variant is fatal to a synchronization run; transient content
/// conditions (a path absent at a revision) are expressed through the
/// operation's return type, not through errors.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The given path is not a usable repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory to materialize into).
    #[error("bare repository not supported: {path}")]
    BareRepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// A revision named by the caller does not exist.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Nothing staged and empty commits were not permitted.
    #[error("nothing to commit")]
    NothingToCommit,

    /// Filesystem failure while touching the working tree.
    #[error("filesystem error at '{path}': {source}")]
    Io {
        /// The path being read or written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A value crossing the boundary failed domain validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Internal git failure.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

/// One commit from a repository's log.
#[derive(Debug, Clone)]
pub struct CommitEntry {
    /// The commit identifier.
    pub id: Oid,
    /// Full commit message.
    pub message: String,
    /// Author timestamp.
    pub timestamp: DateTime<Utc>,
    /// Tracked paths changed by this commit, restricted to the log's path
    /// filter. Empty for unfiltered logs (see [`Vcs::log`]).
    pub changed_paths: Vec<TrackedPath>,
}

/// Capability interface over a single repository.
///
/// Implementations must be safe to share across concurrent per-file tasks
/// within one commit step; mutating operations (`write_worktree`,
/// `stage_all`, `commit`) are only ever invoked from the sequential
/// orchestration path.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Enumerate the commit log, newest first.
    ///
    /// With a non-empty `path_filter`, only commits touching at least one
    /// filtered path are returned, and each entry's `changed_paths` holds
    /// the filtered paths that commit changed, in diff order. With an
    /// empty filter every commit is returned and `changed_paths` is left
    /// empty - unfiltered logs exist for message scanning, and diffing
    /// every commit would be wasted work.
    ///
    /// An unborn repository (no commits yet) yields an empty log.
    async fn log(&self, path_filter: &[TrackedPath]) -> Result<Vec<CommitEntry>, VcsError>;

    /// Check whether `path` exists at `revision`.
    async fn exists_at(&self, revision: &Oid, path: &TrackedPath) -> Result<bool, VcsError>;

    /// Read the content of `path` as committed at `revision`.
    ///
    /// Returns `Ok(None)` if the path does not exist at that revision
    /// (including a path that names a directory rather than a file).
    async fn read_at(
        &self,
        revision: &Oid,
        path: &TrackedPath,
    ) -> Result<Option<Vec<u8>>, VcsError>;

    /// The current head commit, or `None` for an unborn repository.
    async fn head(&self) -> Result<Option<Oid>, VcsError>;

    /// Write `content` to `path` in the working tree, creating parent
    /// directories as needed.
    async fn write_worktree(&self, path: &TrackedPath, content: &[u8]) -> Result<(), VcsError>;

    /// Stage all working-tree changes.
    async fn stage_all(&self) -> Result<(), VcsError>;

    /// Create a commit from the staged state and return its identifier.
    ///
    /// `timestamp` becomes the author and committer time, so replayed
    /// history preserves the origin's chronology. With `allow_empty` set,
    /// a commit is created even when the staged tree matches the parent's;
    /// otherwise that case fails with [`VcsError::NothingToCommit`].
    async fn commit(
        &self,
        message: &str,
        timestamp: DateTime<Utc>,
        allow_empty: bool,
    ) -> Result<Oid, VcsError>;
}
