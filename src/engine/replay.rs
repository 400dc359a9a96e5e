//! engine::replay
//!
//! Replay of one origin commit into the destination working tree.
//!
//! # Destination object cache
//!
//! [`DestCache`] holds each tracked file's accumulated JSON value for the
//! duration of a run. A file's value is loaded from the destination head
//! the first time the file appears in a replayed commit and only mutated
//! through the deep merge afterwards; the destination repository is never
//! re-read for a cached file, because the head does not advance until the
//! current commit step has finished writing the working tree.
//!
//! # Concurrency
//!
//! Source retrieval for a commit's changed files fans out concurrently
//! (each file is an independent read). Cache mutation and working-tree
//! writes then run on the sequential path, so distinct cache keys need no
//! locking at all.

use std::collections::HashMap;

use futures::future;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::core::merge::merge_onto;
use crate::core::types::{Oid, TrackedPath};
use crate::vcs::{CommitEntry, Vcs, VcsError};

/// Errors that abort a replay step.
///
/// Transient content conditions never show up here; they are absorbed as
/// empty merge contributions (see [`SourceContent`]).
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Repository or filesystem access failed.
    #[error("repository access failed while replaying {commit}: {source}")]
    Vcs {
        /// The origin commit being replayed
        commit: Oid,
        /// The underlying accessor error
        #[source]
        source: VcsError,
    },

    /// A cached value could not be serialized for the working tree.
    #[error("serializing '{path}' while replaying {commit}: {source}")]
    Serialize {
        /// The origin commit being replayed
        commit: Oid,
        /// The tracked file being written
        path: TrackedPath,
        /// The underlying serializer error
        #[source]
        source: serde_json::Error,
    },
}

/// Result of reading a tracked file at an origin revision.
///
/// Explicit tri-state so the replayer decides the policy per case instead
/// of funneling everything through error interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceContent {
    /// The file exists and parses as JSON.
    Found(Value),
    /// The file does not exist at that revision (deleted, or not yet added).
    NotFound,
    /// The file exists but its content is not valid JSON.
    Invalid,
}

/// Read and classify a tracked file's content at an origin revision.
pub async fn fetch_source(
    origin: &dyn Vcs,
    revision: &Oid,
    path: &TrackedPath,
) -> Result<SourceContent, VcsError> {
    match origin.read_at(revision, path).await? {
        None => Ok(SourceContent::NotFound),
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(SourceContent::Found(value)),
            Err(_) => Ok(SourceContent::Invalid),
        },
    }
}

/// Per-run cache of each tracked file's accumulated destination value.
#[derive(Debug, Default)]
pub struct DestCache {
    entries: HashMap<TrackedPath, Value>,
}

impl DestCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is cached for `path`.
    pub fn contains(&self, path: &TrackedPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Seed the cache entry for `path`. Only valid for uncached paths.
    fn insert(&mut self, path: TrackedPath, value: Value) {
        self.entries.insert(path, value);
    }

    /// Merge `source` into the cached value for `path` and return the
    /// merged result. Uncached paths start from an empty object.
    fn merge_into(&mut self, path: &TrackedPath, source: Value) -> &Value {
        let entry = self
            .entries
            .entry(path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        merge_onto(source, entry);
        entry
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What one replay step contributed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Files written to the destination working tree.
    pub files_written: usize,
    /// Changed files absent at the origin revision.
    pub sources_missing: usize,
    /// Changed files whose content did not parse as JSON.
    pub sources_invalid: usize,
}

/// Replay one origin commit: merge every changed tracked file's content
/// into the cache and materialize the results to the destination working
/// tree.
///
/// Unreadable source content contributes an empty merge step; the file is
/// still written so the commit step that follows sees a complete tree.
pub async fn replay_commit(
    origin: &dyn Vcs,
    dest: &dyn Vcs,
    commit: &CommitEntry,
    cache: &mut DestCache,
) -> Result<ReplaySummary, ReplayError> {
    let vcs_err = |source: VcsError| ReplayError::Vcs {
        commit: commit.id.clone(),
        source,
    };

    // A commit cannot change the same path twice, but the log is an
    // external input; duplicate keys would break the disjoint-key fan-out.
    let mut paths: Vec<&TrackedPath> = Vec::new();
    for path in &commit.changed_paths {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    let fetches = paths.into_iter().map(|path| {
        let id = &commit.id;
        async move {
            let content = fetch_source(origin, id, path).await?;
            Ok::<_, VcsError>((path.clone(), content))
        }
    });
    let sources = future::try_join_all(fetches).await.map_err(vcs_err)?;

    let mut summary = ReplaySummary::default();
    for (path, content) in sources {
        let source_value = match content {
            SourceContent::Found(value) => value,
            SourceContent::NotFound => {
                debug!(commit = %commit.id.short(12), %path, "path absent at revision, merging nothing");
                summary.sources_missing += 1;
                Value::Object(Map::new())
            }
            SourceContent::Invalid => {
                debug!(commit = %commit.id.short(12), %path, "content is not valid JSON, merging nothing");
                summary.sources_invalid += 1;
                Value::Object(Map::new())
            }
        };

        if !cache.contains(&path) {
            let initial = load_destination_value(dest, &path)
                .await
                .map_err(vcs_err)?;
            cache.insert(path.clone(), initial);
        }

        let merged = cache.merge_into(&path, source_value);

        let mut bytes =
            serde_json::to_vec_pretty(merged).map_err(|source| ReplayError::Serialize {
                commit: commit.id.clone(),
                path: path.clone(),
                source,
            })?;
        bytes.push(b'\n');

        dest.write_worktree(&path, &bytes).await.map_err(vcs_err)?;
        summary.files_written += 1;
    }

    Ok(summary)
}

/// Load a tracked file's current value from the destination head.
///
/// Files absent from the destination (or not yet committed anywhere) start
/// as empty objects. Destination content that fails to parse also falls
/// back to an empty object: it was hand-edited, and refusing to proceed
/// would wedge the sync permanently.
async fn load_destination_value(dest: &dyn Vcs, path: &TrackedPath) -> Result<Value, VcsError> {
    let Some(head) = dest.head().await? else {
        return Ok(Value::Object(Map::new()));
    };

    if !dest.exists_at(&head, path).await? {
        return Ok(Value::Object(Map::new()));
    }

    match dest.read_at(&head, path).await? {
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(%path, error = %e, "destination content is not valid JSON, starting fresh");
                Ok(Value::Object(Map::new()))
            }
        },
        None => Ok(Value::Object(Map::new())),
    }
}
