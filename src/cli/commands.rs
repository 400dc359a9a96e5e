//! cli::commands
//!
//! Command handlers. Each handler resolves configuration, opens the two
//! repositories, and delegates to the engine; no replay logic lives here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::config::{Manifest, SyncConfig};
use crate::engine::Synchronizer;
use crate::vcs::GitRepo;

use super::args::RepoArgs;

/// Default manifest filename, looked up in the working directory.
const DEFAULT_MANIFEST: &str = "jsonrelay.toml";

/// Resolve the run configuration from the manifest and CLI flags.
///
/// An explicit `--manifest` must exist; the default `jsonrelay.toml` is
/// only loaded when present so fully flag-driven invocations work without
/// one. Relative repository roots from a manifest resolve against the
/// manifest's directory; flag-supplied roots resolve against `base`.
fn load_config(base: &Path, args: RepoArgs) -> Result<SyncConfig> {
    let manifest_path = match args.manifest {
        Some(path) => {
            let path = anchor(base, path);
            Some(path)
        }
        None => {
            let default = base.join(DEFAULT_MANIFEST);
            default.exists().then_some(default)
        }
    };

    let (manifest, manifest_dir) = match manifest_path {
        Some(path) => {
            let manifest = Manifest::load(&path)
                .with_context(|| format!("loading manifest '{}'", path.display()))?;
            let dir = path.parent().unwrap_or(base).to_path_buf();
            (manifest, dir)
        }
        None => (Manifest::default(), base.to_path_buf()),
    };

    let origin = args.origin.map(|p| anchor(base, p));
    let dest = args.dest.map(|p| anchor(base, p));

    SyncConfig::resolve(manifest, &manifest_dir, origin, dest, args.tracked)
        .context("resolving configuration")
}

fn anchor(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn open_repos(config: &SyncConfig) -> Result<(GitRepo, GitRepo)> {
    let origin = GitRepo::open(&config.origin_root).with_context(|| {
        format!("opening origin repository '{}'", config.origin_root.display())
    })?;
    let dest = GitRepo::open(&config.dest_root).with_context(|| {
        format!(
            "opening destination repository '{}'",
            config.dest_root.display()
        )
    })?;
    Ok((origin, dest))
}

/// `jsonrelay sync`: replay outstanding origin commits.
pub async fn sync(base: &Path, args: RepoArgs, quiet: bool) -> Result<()> {
    let config = load_config(base, args)?;
    let (origin, dest) = open_repos(&config)?;

    let outcome = Synchronizer::new(&origin, &dest)
        .synchronize(&config.tracked_files)
        .await
        .context("synchronization failed")?;

    if quiet {
        return Ok(());
    }

    if outcome.is_noop() {
        println!("Already up to date.");
        return Ok(());
    }

    for replayed in &outcome.replayed {
        println!(
            "{} -> {}  {}",
            replayed.origin_id.short(8),
            replayed.dest_id.short(8),
            replayed.summary
        );
    }
    println!("Replayed {} commit(s).", outcome.replayed.len());
    Ok(())
}

/// `jsonrelay status`: list outstanding origin commits without replaying.
pub async fn status(base: &Path, args: RepoArgs, quiet: bool) -> Result<()> {
    let config = load_config(base, args)?;
    let (origin, dest) = open_repos(&config)?;

    let pending = Synchronizer::new(&origin, &dest)
        .outstanding(&config.tracked_files)
        .await
        .context("scanning for outstanding commits")?;

    if quiet {
        return Ok(());
    }

    if pending.is_empty() {
        println!("Already up to date.");
        return Ok(());
    }

    for commit in &pending {
        println!(
            "{}  {}  ({} file(s))",
            commit.id.short(8),
            commit.message.lines().next().unwrap_or(""),
            commit.changed_paths.len()
        );
    }
    println!("{} commit(s) outstanding.", pending.len());
    Ok(())
}
