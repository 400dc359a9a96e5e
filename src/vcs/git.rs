//! vcs::git
//!
//! git2-backed accessor implementation.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. All repository reads and writes
//! flow through [`GitRepo`]; no other module imports `git2`. We use the
//! `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Concurrency
//!
//! `git2::Repository` is not `Sync`, but the [`Vcs`] trait is shared across
//! concurrent per-file read tasks within a commit step, so the repository
//! handle lives behind a mutex. Operations hold the lock only for the
//! duration of the libgit2 call; working-tree writes go straight to the
//! filesystem and never take it.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::types::{Oid, TrackedPath};

use super::traits::{CommitEntry, Vcs, VcsError};

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        VcsError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// A git repository opened for synchronization.
pub struct GitRepo {
    repo: Mutex<git2::Repository>,
    work_dir: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl GitRepo {
    /// Open the repository rooted at `path`.
    ///
    /// Roots come from explicit configuration, so this does not discover
    /// upward from subdirectories.
    ///
    /// # Errors
    ///
    /// - [`VcsError::NotARepo`] if `path` is not a git repository
    /// - [`VcsError::BareRepo`] if it has no working directory
    pub fn open(path: &Path) -> Result<Self, VcsError> {
        let repo = git2::Repository::open(path).map_err(|_| VcsError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| VcsError::BareRepo {
                path: path.to_path_buf(),
            })?
            .to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            work_dir,
        })
    }

    /// Path to the working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn repo(&self) -> MutexGuard<'_, git2::Repository> {
        // Lock poisoning only matters if a libgit2 call panicked; the
        // repository handle itself is still usable.
        self.repo.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn head_commit_id(repo: &git2::Repository) -> Result<Option<git2::Oid>, VcsError> {
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_commit<'r>(
        repo: &'r git2::Repository,
        revision: &Oid,
    ) -> Result<git2::Commit<'r>, VcsError> {
        let git_oid = git2::Oid::from_str(revision.as_str()).map_err(|_| {
            VcsError::ObjectNotFound {
                oid: revision.to_string(),
            }
        })?;

        repo.find_commit(git_oid)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => VcsError::ObjectNotFound {
                    oid: revision.to_string(),
                },
                _ => e.into(),
            })
    }

    /// Look up the blob content of `path` in a commit's tree.
    fn blob_at<'r>(
        repo: &'r git2::Repository,
        commit: &git2::Commit<'r>,
        path: &TrackedPath,
    ) -> Result<Option<Vec<u8>>, VcsError> {
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(path.as_str())) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(repo)?;
        match object.as_blob() {
            Some(blob) => Ok(Some(blob.content().to_vec())),
            // The path names a tree or submodule, not file content.
            None => Ok(None),
        }
    }

    /// Tracked paths changed by `commit` relative to its first parent,
    /// restricted to `path_filter`.
    fn changed_paths(
        repo: &git2::Repository,
        commit: &git2::Commit<'_>,
        path_filter: &[TrackedPath],
    ) -> Result<Vec<TrackedPath>, VcsError> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = git2::DiffOptions::new();
        // Filter entries are literal paths, not fnmatch patterns.
        opts.disable_pathspec_match(true);
        for path in path_filter {
            opts.pathspec(path.as_str());
        }

        let diff =
            repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        let mut changed = Vec::new();
        for delta in diff.deltas() {
            let delta_path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path());
            let Some(delta_path) = delta_path.and_then(|p| p.to_str()) else {
                continue;
            };
            // git2 reports slash-normalized relative paths, so this only
            // fails for paths we could never have been asked to track.
            if let Ok(path) = TrackedPath::new(delta_path) {
                changed.push(path);
            }
        }

        Ok(changed)
    }
}

#[async_trait]
impl Vcs for GitRepo {
    async fn log(&self, path_filter: &[TrackedPath]) -> Result<Vec<CommitEntry>, VcsError> {
        let repo = self.repo();

        if Self::head_commit_id(&repo)?.is_none() {
            return Ok(Vec::new());
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push_head()?;

        let mut entries = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;

            let changed_paths = if path_filter.is_empty() {
                Vec::new()
            } else {
                let changed = Self::changed_paths(&repo, &commit, path_filter)?;
                if changed.is_empty() {
                    continue;
                }
                changed
            };

            let timestamp = DateTime::from_timestamp(commit.author().when().seconds(), 0)
                .unwrap_or(DateTime::UNIX_EPOCH);

            entries.push(CommitEntry {
                id: Oid::new(commit.id().to_string())?,
                message: commit.message().unwrap_or("").to_string(),
                timestamp,
                changed_paths,
            });
        }

        Ok(entries)
    }

    async fn exists_at(&self, revision: &Oid, path: &TrackedPath) -> Result<bool, VcsError> {
        let repo = self.repo();
        let commit = Self::find_commit(&repo, revision)?;
        Ok(Self::blob_at(&repo, &commit, path)?.is_some())
    }

    async fn read_at(
        &self,
        revision: &Oid,
        path: &TrackedPath,
    ) -> Result<Option<Vec<u8>>, VcsError> {
        let repo = self.repo();
        let commit = Self::find_commit(&repo, revision)?;
        Self::blob_at(&repo, &commit, path)
    }

    async fn head(&self) -> Result<Option<Oid>, VcsError> {
        let repo = self.repo();
        match Self::head_commit_id(&repo)? {
            Some(oid) => Ok(Some(Oid::new(oid.to_string())?)),
            None => Ok(None),
        }
    }

    async fn write_worktree(&self, path: &TrackedPath, content: &[u8]) -> Result<(), VcsError> {
        let target = path.resolve_in(&self.work_dir);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| VcsError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&target, content)
            .await
            .map_err(|source| VcsError::Io {
                path: target,
                source,
            })
    }

    async fn stage_all(&self) -> Result<(), VcsError> {
        let repo = self.repo();
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
        // add_all does not stage deletions of already-tracked files.
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    async fn commit(
        &self,
        message: &str,
        timestamp: DateTime<Utc>,
        allow_empty: bool,
    ) -> Result<Oid, VcsError> {
        let repo = self.repo();

        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent = match Self::head_commit_id(&repo)? {
            Some(oid) => Some(repo.find_commit(oid)?),
            None => None,
        };

        if !allow_empty {
            let unchanged = match &parent {
                Some(parent) => parent.tree_id() == tree_id,
                None => tree.len() == 0,
            };
            if unchanged {
                return Err(VcsError::NothingToCommit);
            }
        }

        let (name, email) = match repo.signature() {
            Ok(sig) => (
                sig.name().unwrap_or("jsonrelay").to_string(),
                sig.email().unwrap_or("jsonrelay@localhost").to_string(),
            ),
            Err(_) => ("jsonrelay".to_string(), "jsonrelay@localhost".to_string()),
        };
        let sig = git2::Signature::new(
            &name,
            &email,
            &git2::Time::new(timestamp.timestamp(), 0),
        )?;

        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        Ok(Oid::new(oid.to_string())?)
    }
}
