//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! A run is configured by a TOML manifest (canonically `jsonrelay.toml`)
//! naming the two repository roots and the tracked files:
//!
//! ```toml
//! origin = "upstream"
//! dest = "derived"
//! tracked-files = [
//!     "config.json",
//!     "data/regions.json",
//! ]
//! ```
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Manifest file
//! 2. CLI flags (`--origin`, `--dest`, `--tracked`)
//!
//! Repository roots are interpreted relative to the manifest's directory
//! (or the process working directory when given on the command line), so a
//! manifest checked into a parent workspace stays relocatable.
//!
//! # Validation
//!
//! Tracked paths are validated at parse time via [`TrackedPath`]; the
//! resolved config is rejected if the tracked set is empty or contains
//! duplicates, since duplicate cache keys would break the disjoint-key
//! replay invariant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{TrackedPath, TypeError};

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    InvalidPath(#[from] TypeError),
}

/// Manifest file schema.
///
/// All fields are optional in the file so that CLI flags can supply them;
/// [`SyncConfig::resolve`] enforces completeness.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Manifest {
    /// Origin repository root, relative to the manifest.
    pub origin: Option<PathBuf>,

    /// Destination repository root, relative to the manifest.
    pub dest: Option<PathBuf>,

    /// Tracked JSON files, repository-root-relative.
    pub tracked_files: Vec<TrackedPath>,
}

impl Manifest {
    /// Load a manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` or `ConfigError::ParseError`.
    /// Invalid tracked paths are parse errors: the `TrackedPath` field
    /// type validates during deserialization.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Fully resolved run configuration, passed into the orchestrator.
///
/// No component reads the process environment; everything a run needs is
/// carried here explicitly.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Origin repository root.
    pub origin_root: PathBuf,

    /// Destination repository root.
    pub dest_root: PathBuf,

    /// The fixed tracked-file set for the run.
    pub tracked_files: Vec<TrackedPath>,
}

impl SyncConfig {
    /// Resolve a complete configuration from a manifest and CLI overrides.
    ///
    /// `base` anchors relative repository roots (the manifest's directory,
    /// or the working directory for flag-supplied values).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if either repository root is
    /// missing, the tracked set is empty, or it contains duplicates.
    pub fn resolve(
        manifest: Manifest,
        base: &Path,
        origin_flag: Option<PathBuf>,
        dest_flag: Option<PathBuf>,
        tracked_flags: Vec<TrackedPath>,
    ) -> Result<Self, ConfigError> {
        let origin = origin_flag
            .or(manifest.origin)
            .ok_or_else(|| ConfigError::InvalidValue("origin repository not specified".into()))?;
        let dest = dest_flag.or(manifest.dest).ok_or_else(|| {
            ConfigError::InvalidValue("destination repository not specified".into())
        })?;

        let tracked_files = if tracked_flags.is_empty() {
            manifest.tracked_files
        } else {
            tracked_flags
        };

        if tracked_files.is_empty() {
            return Err(ConfigError::InvalidValue(
                "no tracked files specified".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for path in &tracked_files {
            if !seen.insert(path) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate tracked file: {}",
                    path
                )));
            }
        }

        Ok(Self {
            origin_root: anchor(base, origin),
            dest_root: anchor(base, dest),
            tracked_files,
        })
    }
}

fn anchor(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(paths: &[&str]) -> Vec<TrackedPath> {
        paths.iter().map(|p| TrackedPath::new(*p).unwrap()).collect()
    }

    #[test]
    fn manifest_parses_kebab_case() {
        let manifest: Manifest = toml::from_str(
            r#"
            origin = "upstream"
            dest = "derived"
            tracked-files = ["config.json", "data/regions.json"]
            "#,
        )
        .unwrap();
        assert_eq!(manifest.origin, Some(PathBuf::from("upstream")));
        assert_eq!(manifest.tracked_files.len(), 2);
    }

    #[test]
    fn manifest_rejects_unknown_fields() {
        let result: Result<Manifest, _> = toml::from_str("unknown = true");
        assert!(result.is_err());
    }

    #[test]
    fn manifest_rejects_invalid_tracked_path() {
        let result: Result<Manifest, _> =
            toml::from_str(r#"tracked-files = ["../escape.json"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_manifest() {
        let manifest: Manifest = toml::from_str(
            r#"
            origin = "a"
            dest = "b"
            tracked-files = ["x.json"]
            "#,
        )
        .unwrap();

        let config = SyncConfig::resolve(
            manifest,
            Path::new("/ws"),
            Some(PathBuf::from("other")),
            None,
            tracked(&["y.json"]),
        )
        .unwrap();

        assert_eq!(config.origin_root, Path::new("/ws/other"));
        assert_eq!(config.dest_root, Path::new("/ws/b"));
        assert_eq!(config.tracked_files, tracked(&["y.json"]));
    }

    #[test]
    fn absolute_roots_are_kept() {
        let config = SyncConfig::resolve(
            Manifest::default(),
            Path::new("/ws"),
            Some(PathBuf::from("/abs/origin")),
            Some(PathBuf::from("/abs/dest")),
            tracked(&["x.json"]),
        )
        .unwrap();
        assert_eq!(config.origin_root, Path::new("/abs/origin"));
        assert_eq!(config.dest_root, Path::new("/abs/dest"));
    }

    #[test]
    fn missing_pieces_are_rejected() {
        let err = SyncConfig::resolve(
            Manifest::default(),
            Path::new("/ws"),
            None,
            Some(PathBuf::from("d")),
            tracked(&["x.json"]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = SyncConfig::resolve(
            Manifest::default(),
            Path::new("/ws"),
            Some(PathBuf::from("o")),
            Some(PathBuf::from("d")),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn duplicate_tracked_files_are_rejected() {
        let err = SyncConfig::resolve(
            Manifest::default(),
            Path::new("/ws"),
            Some(PathBuf::from("o")),
            Some(PathBuf::from("d")),
            tracked(&["x.json", "x.json"]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
