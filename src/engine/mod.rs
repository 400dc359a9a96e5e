//! engine
//!
//! Resume detection, commit replay, and run orchestration.
//!
//! # Run lifecycle
//!
//! A synchronization run moves through a fixed sequence of states:
//!
//! ```text
//! Scanning -> Replaying(i) -> Committing(i) -> ... -> Done
//! ```
//!
//! **Scanning** enumerates both logs and computes the outstanding origin
//! commits (those without a resume marker in the destination history).
//! Each outstanding commit is then **replayed** into the working tree and
//! **committed**, oldest first. Any fatal error ends the run before the
//! in-progress destination commit is created, which is what makes re-runs
//! safe: resume detection is commit-history-based, never working-tree-based.
//!
//! # Invariants
//!
//! - Commits are strictly sequential; destination commit N's parent is
//!   always destination commit N-1
//! - The destination object cache outlives all commit steps of a run, so
//!   files first seen in a later commit read head state that earlier
//!   commits have already materialized

pub mod replay;
pub mod resume;

pub use replay::{DestCache, ReplayError, ReplaySummary, SourceContent};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::types::{Oid, TrackedPath};
use crate::vcs::{CommitEntry, Vcs, VcsError};

/// Errors that abort a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Enumerating the origin log failed.
    #[error("origin log enumeration failed: {0}")]
    OriginLog(#[source] VcsError),

    /// Enumerating the destination log failed.
    #[error("destination log enumeration failed: {0}")]
    DestLog(#[source] VcsError),

    /// A replay step failed.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Staging or committing the replayed state failed.
    #[error("committing replay of {origin_commit}: {source}")]
    Commit {
        /// The origin commit whose replay could not be committed
        origin_commit: Oid,
        /// The underlying accessor error
        #[source]
        source: VcsError,
    },
}

/// Orchestrator state, reported through debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Scanning,
    Replaying(usize),
    Committing(usize),
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Scanning => write!(f, "scanning"),
            RunState::Replaying(i) => write!(f, "replaying #{}", i + 1),
            RunState::Committing(i) => write!(f, "committing #{}", i + 1),
            RunState::Done => write!(f, "done"),
        }
    }
}

/// One origin commit successfully replayed and committed.
#[derive(Debug, Clone)]
pub struct ReplayedCommit {
    /// The origin commit that was replayed.
    pub origin_id: Oid,
    /// The destination commit recording it.
    pub dest_id: Oid,
    /// First line of the origin commit message.
    pub summary: String,
    /// What the replay step contributed.
    pub replay: ReplaySummary,
}

/// Result of a synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Commits replayed during this run, oldest first.
    pub replayed: Vec<ReplayedCommit>,
}

impl SyncOutcome {
    /// Whether the run found nothing to do.
    pub fn is_noop(&self) -> bool {
        self.replayed.is_empty()
    }
}

/// Drives the end-to-end synchronization of one origin/destination pair.
pub struct Synchronizer<'a> {
    origin: &'a dyn Vcs,
    dest: &'a dyn Vcs,
}

impl<'a> Synchronizer<'a> {
    /// Create a synchronizer over the two repositories.
    pub fn new(origin: &'a dyn Vcs, dest: &'a dyn Vcs) -> Self {
        Self { origin, dest }
    }

    /// Compute the origin commits not yet replayed, oldest first.
    pub async fn outstanding(
        &self,
        tracked: &[TrackedPath],
    ) -> Result<Vec<CommitEntry>, SyncError> {
        // The destination scan is unfiltered: markers can sit on any commit.
        let dest_log = self.dest.log(&[]).await.map_err(SyncError::DestLog)?;
        let origin_log = self
            .origin
            .log(tracked)
            .await
            .map_err(SyncError::OriginLog)?;

        Ok(resume::outstanding(origin_log, &dest_log))
    }

    /// Replay every outstanding origin commit into the destination.
    ///
    /// Idempotent: running twice against an unchanged origin replays
    /// nothing on the second run.
    pub async fn synchronize(&self, tracked: &[TrackedPath]) -> Result<SyncOutcome, SyncError> {
        let mut state = RunState::Scanning;
        debug!(%state, "synchronization started");

        let pending = self.outstanding(tracked).await?;
        info!(outstanding = pending.len(), "scan complete");

        let mut cache = DestCache::new();
        let mut outcome = SyncOutcome::default();

        for (i, commit) in pending.iter().enumerate() {
            state = RunState::Replaying(i);
            debug!(%state, commit = %commit.id.short(12), "replaying origin commit");

            let replay = replay::replay_commit(self.origin, self.dest, commit, &mut cache).await?;

            state = RunState::Committing(i);
            debug!(%state, commit = %commit.id.short(12), "committing replayed state");

            let commit_err = |source: VcsError| SyncError::Commit {
                origin_commit: commit.id.clone(),
                source,
            };

            self.dest.stage_all().await.map_err(commit_err)?;
            let message = resume::destination_message(commit);
            // Empty commits are allowed: a commit whose sources were all
            // unreadable still records its marker.
            let dest_id = self
                .dest
                .commit(&message, commit.timestamp, true)
                .await
                .map_err(commit_err)?;

            info!(
                origin = %commit.id.short(12),
                dest = %dest_id.short(12),
                files = replay.files_written,
                "replayed commit"
            );

            outcome.replayed.push(ReplayedCommit {
                origin_id: commit.id.clone(),
                dest_id,
                summary: commit.message.lines().next().unwrap_or("").to_string(),
                replay,
            });
        }

        state = RunState::Done;
        debug!(%state, replayed = outcome.replayed.len(), "synchronization finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{FailOn, MockVcs};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn path(s: &str) -> TrackedPath {
        TrackedPath::new(s).unwrap()
    }

    fn ts(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn dest_json(dest: &MockVcs, p: &str) -> Value {
        serde_json::from_slice(&dest.head_content(&path(p)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn replays_full_history_into_empty_destination() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        let c1 = origin.push_commit("first", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);
        let c2 = origin.push_commit("second", ts(200), &[("config.json", Some(r#"{"a":2,"b":3}"#))]);

        let tracked = [path("config.json")];
        let outcome = Synchronizer::new(&origin, &dest)
            .synchronize(&tracked)
            .await
            .unwrap();

        assert_eq!(outcome.replayed.len(), 2);
        assert_eq!(outcome.replayed[0].origin_id, c1);
        assert_eq!(outcome.replayed[1].origin_id, c2);
        assert_eq!(dest.commit_count(), 2);
        assert_eq!(dest_json(&dest, "config.json"), json!({"a": 2, "b": 3}));

        // Most recent destination message ends with the second origin id.
        let messages = dest.commit_messages();
        assert!(messages[1].ends_with(c2.as_str()));
        assert!(messages[1].starts_with("second"));
    }

    #[tokio::test]
    async fn second_run_is_a_noop() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("first", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);

        let tracked = [path("config.json")];
        let sync = Synchronizer::new(&origin, &dest);
        sync.synchronize(&tracked).await.unwrap();
        assert_eq!(dest.commit_count(), 1);

        let outcome = sync.synchronize(&tracked).await.unwrap();
        assert!(outcome.is_noop());
        assert_eq!(dest.commit_count(), 1);
    }

    #[tokio::test]
    async fn resumes_after_new_origin_commits() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("first", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);

        let tracked = [path("config.json")];
        let sync = Synchronizer::new(&origin, &dest);
        sync.synchronize(&tracked).await.unwrap();

        let c2 = origin.push_commit("second", ts(200), &[("config.json", Some(r#"{"b":2}"#))]);
        let outcome = sync.synchronize(&tracked).await.unwrap();

        assert_eq!(outcome.replayed.len(), 1);
        assert_eq!(outcome.replayed[0].origin_id, c2);
        assert_eq!(dest.commit_count(), 2);
        assert_eq!(dest_json(&dest, "config.json"), json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn manual_destination_commits_do_not_block() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        dest.push_commit("manual setup, no marker", ts(50), &[("README.md", Some("hi"))]);
        origin.push_commit("first", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);

        let tracked = [path("config.json")];
        let outcome = Synchronizer::new(&origin, &dest)
            .synchronize(&tracked)
            .await
            .unwrap();

        assert_eq!(outcome.replayed.len(), 1);
        assert_eq!(dest.commit_count(), 2);
    }

    #[tokio::test]
    async fn unreadable_sources_still_produce_a_commit() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("good", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);
        origin.push_commit("broken", ts(200), &[("config.json", Some("{ not json"))]);

        let tracked = [path("config.json")];
        let outcome = Synchronizer::new(&origin, &dest)
            .synchronize(&tracked)
            .await
            .unwrap();

        // The broken commit contributes nothing but is still recorded.
        assert_eq!(outcome.replayed.len(), 2);
        assert_eq!(outcome.replayed[1].replay.sources_invalid, 1);
        assert_eq!(dest.commit_count(), 2);
        assert_eq!(dest_json(&dest, "config.json"), json!({"a": 1}));
    }

    #[tokio::test]
    async fn fatal_error_leaves_no_commit_and_rerun_resumes() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("first", ts(100), &[("config.json", Some(r#"{"a":1}"#))]);
        origin.push_commit("second", ts(200), &[("config.json", Some(r#"{"b":2}"#))]);

        let tracked = [path("config.json")];
        let sync = Synchronizer::new(&origin, &dest);

        dest.fail_on(FailOn::Commit);
        assert!(sync.synchronize(&tracked).await.is_err());
        assert_eq!(dest.commit_count(), 0);

        dest.clear_failures();
        let outcome = sync.synchronize(&tracked).await.unwrap();
        assert_eq!(outcome.replayed.len(), 2);
        assert_eq!(dest.commit_count(), 2);
        assert_eq!(dest_json(&dest, "config.json"), json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn multiple_tracked_files_stay_independent() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit(
            "both",
            ts(100),
            &[
                ("a.json", Some(r#"{"x":1}"#)),
                ("b.json", Some(r#"{"y":2}"#)),
            ],
        );
        origin.push_commit("only a", ts(200), &[("a.json", Some(r#"{"x":9}"#))]);

        let tracked = [path("a.json"), path("b.json")];
        Synchronizer::new(&origin, &dest)
            .synchronize(&tracked)
            .await
            .unwrap();

        assert_eq!(dest_json(&dest, "a.json"), json!({"x": 9}));
        assert_eq!(dest_json(&dest, "b.json"), json!({"y": 2}));
    }

    #[tokio::test]
    async fn destination_timestamps_mirror_origin() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("first", ts(1234), &[("config.json", Some("{}"))]);

        let tracked = [path("config.json")];
        Synchronizer::new(&origin, &dest)
            .synchronize(&tracked)
            .await
            .unwrap();

        let dest_log = dest.log(&[]).await.unwrap();
        assert_eq!(dest_log[0].timestamp, ts(1234));
    }

    #[tokio::test]
    async fn outstanding_preview_does_not_mutate() {
        let origin = MockVcs::new();
        let dest = MockVcs::new();
        origin.push_commit("first", ts(100), &[("config.json", Some("{}"))]);

        let tracked = [path("config.json")];
        let pending = Synchronizer::new(&origin, &dest)
            .outstanding(&tracked)
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(dest.commit_count(), 0);
        assert!(dest.operations().iter().all(|op| matches!(
            op,
            crate::vcs::MockOperation::Log
        )));
    }
}
