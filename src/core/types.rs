//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//! - [`RepoId`] - Owner and name of a remote repository
//! - [`RepoPath`] - Normalized repository-relative file path
//! - [`ErrorKind`] - Failure classification shared by every error type
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a request that reaches the remote has already
//! been checked locally.
//!
//! # Examples
//!
//! ```
//! use forgetree::core::types::{BranchName, Oid, RefName, RepoPath};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/feature/my-branch");
//!
//! // Pre-encoded and plain paths normalize to the same value
//! let a = RepoPath::new("docs/my file.txt").unwrap();
//! let b = RepoPath::new("docs/my%20file.txt").unwrap();
//! assert_eq!(a, b);
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Ref, commit, tree or path does not exist
    NotFound,
    /// The request was malformed or refused (4xx other than 404/409)
    RemoteRejected,
    /// Non-fast-forward ref update or duplicate ref
    Conflict,
    /// Network failure or 5xx
    RemoteUnavailable,
    /// The caller cancelled the operation
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::RemoteRejected => "remote rejected",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RemoteUnavailable => "remote unavailable",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid repository: {0}")]
    InvalidRepo(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl TypeError {
    /// Classify this error. Malformed input is refused locally the way the
    /// remote would refuse it.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RemoteRejected
    }
}

/// Characters git refuses anywhere in a ref name.
const INVALID_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use forgetree::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// A leading `refs/heads/` is stripped, so both the short and the fully
    /// qualified spelling are accepted.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let name = match name.strip_prefix("refs/heads/") {
            Some(short) => short.to_string(),
            None => name,
        };
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return invalid("branch name cannot be empty");
        }
        if name == "@" {
            return invalid("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') {
            return invalid("branch name cannot start with '.'");
        }
        if name.starts_with('-') {
            return invalid("branch name cannot start with '-'");
        }
        if name.ends_with(".lock") {
            return invalid("branch name cannot end with '.lock'");
        }
        if name.ends_with('/') {
            return invalid("branch name cannot end with '/'");
        }
        if name.contains("..") {
            return invalid("branch name cannot contain '..'");
        }
        if name.contains("@{") {
            return invalid("branch name cannot contain '@{'");
        }
        if name.contains("//") {
            return invalid("branch name cannot contain '//'");
        }
        for c in INVALID_REF_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{c}'"
                )));
            }
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return invalid("branch name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return invalid("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return invalid("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use forgetree::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// The OID is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Build an id from a raw SHA-256 digest.
    pub fn from_sha256(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// # Example
///
/// ```
/// use forgetree::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("feature/foo").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/feature/foo");
/// assert_eq!(refname.branch().unwrap(), branch);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name is not under `refs/`
    /// or violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(format!(
                "'{}' is not under refs/",
                name
            )));
        }
        // A ref obeys the same component rules as a branch name.
        BranchName::validate(&name).map_err(|e| match e {
            TypeError::InvalidBranchName(msg) => {
                TypeError::InvalidRefName(msg.replace("branch name", "ref name"))
            }
            other => other,
        })?;
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The branch this ref points into, if it is a branch ref.
    pub fn branch(&self) -> Option<BranchName> {
        self.0
            .strip_prefix("refs/heads/")
            .and_then(|b| BranchName::new(b).ok())
    }

    /// The ref name without its leading `refs/`.
    ///
    /// This is the form the git data API expects in URL paths
    /// (`git/refs/heads/main`).
    pub fn short(&self) -> &str {
        self.0.strip_prefix("refs/").unwrap_or(&self.0)
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote repository identified by owner (user or organization) and name.
///
/// # Example
///
/// ```
/// use forgetree::core::types::RepoId;
///
/// let repo = RepoId::parse("octocat/hello-world").unwrap();
/// assert_eq!(repo.owner(), "octocat");
/// assert_eq!(repo.name(), "hello-world");
/// assert_eq!(repo.to_string(), "octocat/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Create a repository id from its two parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepo` if either part is empty or contains
    /// `/`, whitespace, or control characters.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        Self::validate_part("owner", &owner)?;
        Self::validate_part("repository name", &name)?;
        Ok(Self { owner, name })
    }

    /// Parse `owner/name`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidRepo(format!("expected owner/repo, got '{}'", s)))?;
        Self::new(owner, name)
    }

    fn validate_part(what: &str, part: &str) -> Result<(), TypeError> {
        if part.is_empty() {
            return Err(TypeError::InvalidRepo(format!("{} cannot be empty", what)));
        }
        if part.contains('/') || part.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidRepo(format!(
                "{} '{}' contains invalid characters",
                what, part
            )));
        }
        Ok(())
    }

    /// Repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A normalized, repository-relative file path.
///
/// Each `/`-delimited segment is percent-decoded on construction, so a path
/// that arrives already encoded (`my%20file.txt`) and one that does not
/// (`my file.txt`) compare equal. [`RepoPath::encoded`] re-encodes each
/// segment independently for use in a URL.
///
/// A `%` not followed by two hex digits is kept literally.
///
/// # Example
///
/// ```
/// use forgetree::core::types::RepoPath;
///
/// let path = RepoPath::new("notes/100% done.md").unwrap();
/// assert_eq!(path.as_str(), "notes/100% done.md");
/// assert_eq!(path.encoded(), "notes/100%25%20done.md");
///
/// assert!(RepoPath::new("/absolute").is_err());
/// assert!(RepoPath::new("a//b").is_err());
/// assert!(RepoPath::new("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Create a normalized path, percent-decoding each segment.
    ///
    /// Use this for paths typed by a user or copied out of a URL.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` for empty paths, leading or trailing
    /// `/`, empty segments, `.` or `..` segments, segments that decode to
    /// contain `/`, and control characters.
    pub fn new(path: impl AsRef<str>) -> Result<Self, TypeError> {
        Self::parse(path.as_ref(), true)
    }

    /// Create a path that names the file exactly as written, with no
    /// percent-decoding. `reports/q1%20final.md` stays byte-for-byte.
    ///
    /// Paths of files being written go through here, so the name recorded
    /// in the tree is the name the caller supplied.
    ///
    /// # Errors
    ///
    /// Same structural rules as [`RepoPath::new`].
    pub fn literal(path: impl AsRef<str>) -> Result<Self, TypeError> {
        Self::parse(path.as_ref(), false)
    }

    fn parse(raw: &str, decode: bool) -> Result<Self, TypeError> {
        let invalid = |msg: String| Err(TypeError::InvalidPath(msg));

        if raw.is_empty() {
            return invalid("path cannot be empty".into());
        }
        if raw.starts_with('/') || raw.ends_with('/') {
            return invalid(format!("'{}' must not start or end with '/'", raw));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            if segment.is_empty() {
                return invalid(format!("'{}' contains an empty segment", raw));
            }
            let segment = if decode {
                decode_segment(segment)
            } else {
                segment.to_string()
            };
            if segment == "." || segment == ".." {
                return invalid(format!("'{}' contains a relative segment", raw));
            }
            if segment.contains('/') {
                return invalid(format!("segment '{}' decodes to contain '/'", segment));
            }
            if segment.chars().any(|c| c.is_control()) {
                return invalid(format!("'{}' contains control characters", raw));
            }
            segments.push(segment);
        }

        Ok(Self(segments.join("/")))
    }

    /// The path with every segment percent-encoded independently.
    pub fn encoded(&self) -> String {
        self.0
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Get the decoded path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Percent-decode one path segment, keeping it verbatim when the decoded
/// bytes are not UTF-8.
fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

impl TryFrom<String> for RepoPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
