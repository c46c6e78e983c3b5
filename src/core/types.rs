//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepositoryName`] - Validated short repository name
//! - [`CommitId`] - Git commit hash (full SHA)
//! - [`ObjectKey`] - Destination key in the remote object store
//! - [`VersionBranch`] - A parsed "major.minor" version branch
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs, in
//! particular malformed object keys reaching the store client.
//!
//! # Examples
//!
//! ```
//! use bindery::core::types::{CommitId, ObjectKey, RepositoryName, VersionBranch};
//!
//! let repo = RepositoryName::new("kibana").unwrap();
//! assert_eq!(repo.as_str(), "kibana");
//!
//! let key = ObjectKey::new("docs/kibana/index.html").unwrap();
//! assert_eq!(key.as_str(), "docs/kibana/index.html");
//!
//! let version = VersionBranch::parse("9.2").unwrap();
//! assert!(version > VersionBranch::parse("9.1").unwrap());
//!
//! // Invalid constructions fail at creation time
//! assert!(RepositoryName::new("has space").is_err());
//! assert!(ObjectKey::new("../escape").is_err());
//! assert!(CommitId::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository name: {0}")]
    InvalidRepositoryName(String),

    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),
}

/// A validated short repository name.
///
/// Repository names are the keys of the configuration table and the
/// schemes of cross-link URIs. They must be:
/// - Non-empty
/// - ASCII alphanumeric plus `-`, `_`, and `.`
/// - Free of path separators (names are joined into filesystem paths
///   and URLs without further escaping)
///
/// # Example
///
/// ```
/// use bindery::core::types::RepositoryName;
///
/// let name = RepositoryName::new("elasticsearch-js").unwrap();
/// assert_eq!(name.as_str(), "elasticsearch-js");
///
/// assert!(RepositoryName::new("").is_err());
/// assert!(RepositoryName::new("org/repo").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Create a new validated repository name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepositoryName` if the name is empty or
    /// contains a character outside `[A-Za-z0-9._-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidRepositoryName(
                "repository name cannot be empty".into(),
            ));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidRepositoryName(
                "repository name cannot start with '.'".into(),
            ));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TypeError::InvalidRepositoryName(format!(
                "repository name cannot contain '{}'",
                bad
            )));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryName> for String {
    fn from(name: RepositoryName) -> String {
        name.0
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full Git commit hash.
///
/// Normalized to lowercase. Exactly 40 hex characters.
///
/// # Example
///
/// ```
/// use bindery::core::types::CommitId;
///
/// let id = CommitId::new("ABC123def4567890abc123def4567890abc12345").unwrap();
/// assert_eq!(id.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(id.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Create a new validated commit id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the value is not exactly
    /// 40 hexadecimal characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into().to_lowercase();
        if id.len() != 40 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitId(id));
        }
        Ok(Self(id))
    }

    /// Get the full hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get an abbreviated form of the hash.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> String {
        id.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated destination key in the remote object store.
///
/// Keys use `/` as the separator regardless of platform. They must be:
/// - Non-empty
/// - Relative (no leading `/`)
/// - Free of backslashes, `..` components, and empty components
///
/// # Example
///
/// ```
/// use bindery::core::types::ObjectKey;
///
/// let key = ObjectKey::new("docs/current/index.html").unwrap();
/// assert_eq!(key.as_str(), "docs/current/index.html");
///
/// assert!(ObjectKey::new("/absolute").is_err());
/// assert!(ObjectKey::new("a//b").is_err());
/// assert!(ObjectKey::new("a/../b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new validated object key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidObjectKey` if the key is empty,
    /// absolute, or contains `\`, `..`, or an empty component.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        if key.is_empty() {
            return Err(TypeError::InvalidObjectKey("key cannot be empty".into()));
        }
        if key.starts_with('/') {
            return Err(TypeError::InvalidObjectKey(format!(
                "key cannot be absolute: {}",
                key
            )));
        }
        if key.contains('\\') {
            return Err(TypeError::InvalidObjectKey(format!(
                "key cannot contain '\\': {}",
                key
            )));
        }
        if key.split('/').any(|c| c.is_empty() || c == "..") {
            return Err(TypeError::InvalidObjectKey(format!(
                "key cannot contain empty or '..' components: {}",
                key
            )));
        }
        Ok(Self(key))
    }

    /// Build a key by joining a prefix and a relative path.
    ///
    /// An empty prefix yields the bare path.
    pub fn under_prefix(prefix: &str, relative: &str) -> Result<Self, TypeError> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            Self::new(relative)
        } else {
            Self::new(format!("{}/{}", prefix, relative))
        }
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file extension of the key, if any.
    ///
    /// Used for low-cardinality metrics grouping.
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> String {
        key.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the three branches of a repository that may be published
/// simultaneously for different audiences.
///
/// `Current` is the stable line, `Next` the upcoming release, `Edge`
/// the bleeding edge. Which branch plays which role is configuration,
/// not convention; the same branch name may serve different roles in
/// different repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    /// The stable, currently released documentation line.
    Current,
    /// The upcoming release line.
    Next,
    /// The development line.
    Edge,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::Current => write!(f, "current"),
            ContentSource::Next => write!(f, "next"),
            ContentSource::Edge => write!(f, "edge"),
        }
    }
}

/// A parsed "major.minor" version branch.
///
/// Version branches such as `8.19` or `9.2` identify release lines.
/// Parsing is strict: exactly two dot-separated decimal components,
/// no prefix, no suffix.
///
/// # Example
///
/// ```
/// use bindery::core::types::VersionBranch;
///
/// assert!(VersionBranch::parse("9.2").is_some());
/// assert!(VersionBranch::parse("main").is_none());
/// assert!(VersionBranch::parse("9.2.1").is_none());
/// assert!(VersionBranch::parse("v9.2").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionBranch {
    /// Major version component.
    pub major: u64,
    /// Minor version component.
    pub minor: u64,
}

impl VersionBranch {
    /// Parse a branch name as a version branch.
    ///
    /// Returns `None` when the name is not of the `major.minor` form.
    pub fn parse(branch: &str) -> Option<Self> {
        let (major, minor) = branch.split_once('.')?;
        if major.is_empty() || minor.is_empty() {
            return None;
        }
        if !major.chars().all(|c| c.is_ascii_digit())
            || !minor.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl std::fmt::Display for VersionBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
