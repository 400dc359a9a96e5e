//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`TrackedPath`] - Validated repository-relative path of a tracked file
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs: an [`Oid`]
//! is always full-length hex, and a [`TrackedPath`] can never escape the
//! repository root or carry platform-specific separators.
//!
//! # Examples
//!
//! ```
//! use jsonrelay::core::types::{Oid, TrackedPath};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(oid.short(7), "abc123d");
//!
//! let path = TrackedPath::new("configs/app.json").unwrap();
//! assert_eq!(path.as_str(), "configs/app.json");
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(TrackedPath::new("../escape.json").is_err());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid tracked path: {0}")]
    InvalidTrackedPath(String),
}

/// A validated Git object identifier.
///
/// OIDs are full-length lowercase hex strings (40 characters for SHA-1,
/// 64 for SHA-256 repositories).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// The OID is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a full-length
    /// hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!(
                "non-hex character in '{}'",
                oid
            )));
        }
        Ok(())
    }

    /// Get the OID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

/// A validated, slash-normalized, repository-root-relative path to a
/// tracked JSON file.
///
/// Tracked paths are the keys of the destination object cache and the
/// path filter handed to the origin log, so their normalization matters:
/// two spellings of the same file must compare equal.
///
/// Rules:
/// - Cannot be empty
/// - Cannot be absolute
/// - Uses `/` as the separator (backslashes are rejected, not converted)
/// - Cannot contain `.` or `..` components, empty components, or a
///   trailing slash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackedPath(String);

impl TrackedPath {
    /// Create a new validated tracked path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTrackedPath` if the path violates the
    /// rules above.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidTrackedPath(
                "path cannot be empty".into(),
            ));
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidTrackedPath(format!(
                "path must be repository-relative: '{}'",
                path
            )));
        }
        if path.contains('\\') {
            return Err(TypeError::InvalidTrackedPath(format!(
                "path must use '/' separators: '{}'",
                path
            )));
        }
        if path.ends_with('/') {
            return Err(TypeError::InvalidTrackedPath(format!(
                "path cannot end with '/': '{}'",
                path
            )));
        }
        for component in path.split('/') {
            if component.is_empty() {
                return Err(TypeError::InvalidTrackedPath(format!(
                    "empty path component in '{}'",
                    path
                )));
            }
            if component == "." || component == ".." {
                return Err(TypeError::InvalidTrackedPath(format!(
                    "'.' and '..' components are not allowed: '{}'",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this path against a repository working-tree root.
    pub fn resolve_in(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        for component in self.0.split('/') {
            resolved.push(component);
        }
        resolved
    }
}

impl std::fmt::Display for TrackedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TrackedPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for TrackedPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<TrackedPath> for String {
    fn from(path: TrackedPath) -> Self {
        path.0
    }
}
