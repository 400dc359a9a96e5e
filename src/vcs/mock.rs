//! vcs::mock
//!
//! Mock accessor implementation for deterministic testing.
//!
//! # Design
//!
//! [`MockVcs`] keeps an entire repository in memory: an ordered commit
//! list with full content snapshots, a working tree, and a staging area.
//! Tests script origin history with [`MockVcs::push_commit`], inject
//! failures with [`MockVcs::fail_on`], and inspect the recorded operation
//! log to verify engine behavior such as "the destination head is read at
//! most once per file per run".
//!
//! # Example
//!
//! ```
//! use jsonrelay::vcs::{MockVcs, Vcs};
//! use jsonrelay::core::types::TrackedPath;
//! use chrono::Utc;
//!
//! # tokio_test::block_on(async {
//! let origin = MockVcs::new();
//! let id = origin.push_commit("add config", Utc::now(), &[("config.json", Some(r#"{"a":1}"#))]);
//!
//! let tracked = [TrackedPath::new("config.json").unwrap()];
//! let log = origin.log(&tracked).await.unwrap();
//! assert_eq!(log.len(), 1);
//! assert_eq!(log[0].id, id);
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::types::{Oid, TrackedPath};

use super::traits::{CommitEntry, Vcs, VcsError};

/// Mock repository for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Commits, oldest first.
    commits: Vec<MockCommit>,
    /// Working tree contents.
    worktree: BTreeMap<TrackedPath, Vec<u8>>,
    /// Staged snapshot, if `stage_all` has run since the last commit.
    staged: Option<BTreeMap<TrackedPath, Vec<u8>>>,
    /// Counter for fabricated commit ids.
    next_commit: u64,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug)]
struct MockCommit {
    id: Oid,
    message: String,
    timestamp: DateTime<Utc>,
    changed_paths: Vec<TrackedPath>,
    /// Full content snapshot at this commit.
    snapshot: BTreeMap<TrackedPath, Vec<u8>>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// Fail `log`.
    Log,
    /// Fail `read_at`.
    ReadAt,
    /// Fail `write_worktree`.
    WriteWorktree,
    /// Fail `stage_all`.
    StageAll,
    /// Fail `commit`.
    Commit,
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Log,
    ExistsAt {
        revision: Oid,
        path: TrackedPath,
    },
    ReadAt {
        revision: Oid,
        path: TrackedPath,
    },
    WriteWorktree {
        path: TrackedPath,
    },
    StageAll,
    Commit {
        message: String,
        allow_empty: bool,
    },
}

impl MockVcs {
    /// Create an empty mock repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit, applying `changes` on top of the previous snapshot.
    ///
    /// Each change is `(path, content)`; `None` content deletes the path.
    /// The working tree is updated to match the new snapshot, the way a
    /// checked-out repository would look.
    ///
    /// # Panics
    ///
    /// Panics on an invalid tracked path; this is test scripting, not an
    /// error path worth modeling.
    pub fn push_commit(
        &self,
        message: &str,
        timestamp: DateTime<Utc>,
        changes: &[(&str, Option<&str>)],
    ) -> Oid {
        let mut inner = self.lock();

        let mut snapshot = inner
            .commits
            .last()
            .map(|c| c.snapshot.clone())
            .unwrap_or_default();

        let mut changed_paths = Vec::new();
        for (raw_path, content) in changes {
            let path = TrackedPath::new(*raw_path).expect("invalid tracked path in test script");
            match content {
                Some(content) => {
                    snapshot.insert(path.clone(), content.as_bytes().to_vec());
                }
                None => {
                    snapshot.remove(&path);
                }
            }
            changed_paths.push(path);
        }

        let id = inner.fabricate_oid();
        inner.worktree = snapshot.clone();
        inner.commits.push(MockCommit {
            id: id.clone(),
            message: message.to_string(),
            timestamp,
            changed_paths,
            snapshot,
        });
        id
    }

    /// Configure the next matching operation to fail.
    pub fn fail_on(&self, fail: FailOn) {
        self.lock().fail_on = Some(fail);
    }

    /// Clear any configured failure.
    pub fn clear_failures(&self) {
        self.lock().fail_on = None;
    }

    /// Number of commits in the repository.
    pub fn commit_count(&self) -> usize {
        self.lock().commits.len()
    }

    /// Commit messages, oldest first.
    pub fn commit_messages(&self) -> Vec<String> {
        self.lock()
            .commits
            .iter()
            .map(|c| c.message.clone())
            .collect()
    }

    /// Content of `path` at the current head, if committed.
    pub fn head_content(&self, path: &TrackedPath) -> Option<Vec<u8>> {
        let inner = self.lock();
        inner.commits.last()?.snapshot.get(path).cloned()
    }

    /// Content of `path` in the working tree.
    pub fn worktree_content(&self, path: &TrackedPath) -> Option<Vec<u8>> {
        self.lock().worktree.get(path).cloned()
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn fabricate_oid(&mut self) -> Oid {
        self.next_commit += 1;
        // Deterministic fake SHAs keep test assertions readable.
        Oid::new(format!("{:040x}", self.next_commit)).expect("fabricated oid is valid hex")
    }

    fn injected_failure(&self, op: FailOn) -> Result<(), VcsError> {
        if self.fail_on == Some(op) {
            return Err(VcsError::Internal {
                message: format!("injected failure: {:?}", op),
            });
        }
        Ok(())
    }

    fn find_commit(&self, revision: &Oid) -> Result<&MockCommit, VcsError> {
        self.commits
            .iter()
            .find(|c| &c.id == revision)
            .ok_or_else(|| VcsError::ObjectNotFound {
                oid: revision.to_string(),
            })
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn log(&self, path_filter: &[TrackedPath]) -> Result<Vec<CommitEntry>, VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Log);
        inner.injected_failure(FailOn::Log)?;

        let mut entries = Vec::new();
        // Newest first, like a real log.
        for commit in inner.commits.iter().rev() {
            let changed_paths = if path_filter.is_empty() {
                Vec::new()
            } else {
                let changed: Vec<TrackedPath> = commit
                    .changed_paths
                    .iter()
                    .filter(|p| path_filter.contains(p))
                    .cloned()
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                changed
            };

            entries.push(CommitEntry {
                id: commit.id.clone(),
                message: commit.message.clone(),
                timestamp: commit.timestamp,
                changed_paths,
            });
        }

        Ok(entries)
    }

    async fn exists_at(&self, revision: &Oid, path: &TrackedPath) -> Result<bool, VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ExistsAt {
            revision: revision.clone(),
            path: path.clone(),
        });
        Ok(inner.find_commit(revision)?.snapshot.contains_key(path))
    }

    async fn read_at(
        &self,
        revision: &Oid,
        path: &TrackedPath,
    ) -> Result<Option<Vec<u8>>, VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ReadAt {
            revision: revision.clone(),
            path: path.clone(),
        });
        inner.injected_failure(FailOn::ReadAt)?;
        Ok(inner.find_commit(revision)?.snapshot.get(path).cloned())
    }

    async fn head(&self) -> Result<Option<Oid>, VcsError> {
        Ok(self.lock().commits.last().map(|c| c.id.clone()))
    }

    async fn write_worktree(&self, path: &TrackedPath, content: &[u8]) -> Result<(), VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::WriteWorktree {
            path: path.clone(),
        });
        inner.injected_failure(FailOn::WriteWorktree)?;
        inner.worktree.insert(path.clone(), content.to_vec());
        Ok(())
    }

    async fn stage_all(&self) -> Result<(), VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::StageAll);
        inner.injected_failure(FailOn::StageAll)?;
        inner.staged = Some(inner.worktree.clone());
        Ok(())
    }

    async fn commit(
        &self,
        message: &str,
        timestamp: DateTime<Utc>,
        allow_empty: bool,
    ) -> Result<Oid, VcsError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Commit {
            message: message.to_string(),
            allow_empty,
        });
        inner.injected_failure(FailOn::Commit)?;

        let staged = inner.staged.take().unwrap_or_else(|| inner.worktree.clone());
        let previous = inner
            .commits
            .last()
            .map(|c| c.snapshot.clone())
            .unwrap_or_default();

        if !allow_empty && staged == previous {
            return Err(VcsError::NothingToCommit);
        }

        let changed_paths: Vec<TrackedPath> = staged
            .iter()
            .filter(|(path, content)| previous.get(*path) != Some(content))
            .map(|(path, _)| path.clone())
            .chain(
                previous
                    .keys()
                    .filter(|path| !staged.contains_key(*path))
                    .cloned(),
            )
            .collect();

        let id = inner.fabricate_oid();
        inner.commits.push(MockCommit {
            id: id.clone(),
            message: message.to_string(),
            timestamp,
            changed_paths,
            snapshot: staged,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> TrackedPath {
        TrackedPath::new(s).unwrap()
    }

    #[tokio::test]
    async fn push_commit_builds_snapshots() {
        let vcs = MockVcs::new();
        let c1 = vcs.push_commit("one", Utc::now(), &[("a.json", Some("{}"))]);
        let c2 = vcs.push_commit("two", Utc::now(), &[("a.json", None)]);

        assert_eq!(
            vcs.read_at(&c1, &path("a.json")).await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(vcs.read_at(&c2, &path("a.json")).await.unwrap(), None);
        assert!(vcs.exists_at(&c1, &path("a.json")).await.unwrap());
        assert!(!vcs.exists_at(&c2, &path("a.json")).await.unwrap());
    }

    #[tokio::test]
    async fn filtered_log_skips_untracked_commits() {
        let vcs = MockVcs::new();
        vcs.push_commit("tracked", Utc::now(), &[("a.json", Some("1"))]);
        vcs.push_commit("other", Utc::now(), &[("b.json", Some("2"))]);

        let log = vcs.log(&[path("a.json")]).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "tracked");

        // Unfiltered log sees everything, newest first.
        let all = vcs.log(&[]).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "other");
    }

    #[tokio::test]
    async fn stage_and_commit_round_trip() {
        let vcs = MockVcs::new();
        vcs.write_worktree(&path("a.json"), b"{}").await.unwrap();
        vcs.stage_all().await.unwrap();
        let id = vcs.commit("msg", Utc::now(), false).await.unwrap();

        assert_eq!(vcs.head().await.unwrap(), Some(id));
        assert_eq!(vcs.head_content(&path("a.json")), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn empty_commit_requires_allow_empty() {
        let vcs = MockVcs::new();
        vcs.push_commit("base", Utc::now(), &[("a.json", Some("{}"))]);

        vcs.stage_all().await.unwrap();
        let err = vcs.commit("noop", Utc::now(), false).await.unwrap_err();
        assert!(matches!(err, VcsError::NothingToCommit));

        vcs.stage_all().await.unwrap();
        assert!(vcs.commit("noop", Utc::now(), true).await.is_ok());
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let vcs = MockVcs::new();
        vcs.push_commit("base", Utc::now(), &[("a.json", Some("{}"))]);
        vcs.fail_on(FailOn::Log);
        assert!(vcs.log(&[]).await.is_err());
        vcs.clear_failures();
        assert!(vcs.log(&[]).await.is_ok());
    }
}
