//! forge::traits
//!
//! The object-level interface to a remote forge.
//!
//! # Design
//!
//! [`ObjectStore`] exposes the git data primitives of a hosting service:
//! refs, commits, trees, blobs, plus file contents and repository metadata.
//! Every method is exactly one remote round-trip and never retries. Reads
//! are idempotent; creations are not, although blobs and trees are content
//! addressed so repeating one yields the same hash.
//!
//! The trait is async because every operation is network I/O, and object
//! safe so the engine can hold a `&dyn ObjectStore`.
//!
//! # Errors
//!
//! [`ForgeError`] carries the remote status verbatim together with the
//! detail payload the remote returned. [`ForgeError::kind`] folds it into
//! the small set of [`ErrorKind`]s callers branch on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::request::{decode_base64, BlobEncoding};
pub use crate::core::types::ErrorKind;
use crate::core::types::{BranchName, Oid, RefName, RepoId, RepoPath};

/// Errors from forge operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// The requested object or ref does not exist.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The ref moved (non-fast-forward) or already exists.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The remote refused the request.
    #[error("remote rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The remote could not be reached or failed internally.
    #[error("remote unavailable: {message}")]
    Unavailable {
        /// HTTP status, if a response was received
        status: Option<u16>,
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The request failed local validation and was never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ForgeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForgeError::NotFound { .. } => ErrorKind::NotFound,
            ForgeError::Conflict { .. } => ErrorKind::Conflict,
            ForgeError::Rejected { .. } | ForgeError::InvalidRequest(_) => {
                ErrorKind::RemoteRejected
            }
            ForgeError::Unavailable { .. } => ErrorKind::RemoteUnavailable,
        }
    }

    /// The detail payload returned by the remote, if any.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            ForgeError::NotFound { detail, .. }
            | ForgeError::Conflict { detail, .. }
            | ForgeError::Rejected { detail, .. }
            | ForgeError::Unavailable { detail, .. } => detail.as_ref(),
            ForgeError::InvalidRequest(_) => None,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        ForgeError::NotFound {
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        ForgeError::Conflict {
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn rejected(status: u16, message: impl Into<String>) -> Self {
        ForgeError::Rejected {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        ForgeError::Unavailable {
            status,
            message: message.into(),
            detail: None,
        }
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule gitlink
    Commit,
}

/// Git file mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    #[serde(rename = "100644")]
    Regular,
    #[serde(rename = "100755")]
    Executable,
    #[serde(rename = "120000")]
    Symlink,
    #[serde(rename = "040000")]
    Directory,
    #[serde(rename = "160000")]
    Submodule,
}

impl FileMode {
    /// Octal mode string as git writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
            FileMode::Directory => "040000",
            FileMode::Submodule => "160000",
        }
    }
}

/// A commit as read back from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: Oid,
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub message: String,
}

/// A commit to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub message: String,
    pub tree: Oid,
    /// Parent commits, first parent first
    pub parents: Vec<Oid>,
}

/// One entry of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Path relative to the listed tree (full path when recursive)
    pub path: String,
    pub mode: FileMode,
    pub kind: EntryKind,
    pub sha: Oid,
    /// Size in bytes, blobs only
    pub size: Option<u64>,
}

/// Result of reading a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeListing {
    /// Hash of the tree that was listed
    pub sha: Oid,
    pub entries: Vec<TreeEntry>,
    /// The remote stopped before listing every entry
    pub truncated: bool,
}

impl TreeListing {
    /// Blob entries only.
    pub fn blobs(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Blob)
    }
}

/// An entry to place in a new tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreeEntry {
    pub path: RepoPath,
    pub mode: FileMode,
    pub kind: EntryKind,
    pub sha: Oid,
}

impl NewTreeEntry {
    /// A regular file entry pointing at a blob.
    pub fn blob(path: RepoPath, sha: Oid) -> Self {
        Self {
            path,
            mode: FileMode::Regular,
            kind: EntryKind::Blob,
            sha,
        }
    }
}

/// A file read through the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub path: RepoPath,
    pub sha: Oid,
    pub size: u64,
    /// Encoding of `content` as reported by the remote (usually `base64`)
    pub encoding: String,
    pub content: String,
}

impl FileContent {
    /// The raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Unavailable` if the encoding is neither `base64`
    /// nor `utf-8`, if the content does not match its declared encoding, or
    /// if the decoded length differs from `size`.
    pub fn decoded(&self) -> Result<Vec<u8>, ForgeError> {
        let bytes = if self.encoding == BlobEncoding::Base64.as_str() {
            decode_base64(&self.content).map_err(|e| {
                ForgeError::unavailable(
                    None,
                    format!("undecodable content for '{}': {}", self.path, e),
                )
            })?
        } else if self.encoding == BlobEncoding::Utf8.as_str() {
            self.content.as_bytes().to_vec()
        } else {
            return Err(ForgeError::unavailable(
                None,
                format!(
                    "content of '{}' is not available (encoding '{}')",
                    self.path, self.encoding
                ),
            ));
        };

        if bytes.len() as u64 != self.size {
            return Err(ForgeError::unavailable(
                None,
                format!(
                    "content of '{}' is {} bytes, expected {}",
                    self.path,
                    bytes.len(),
                    self.size
                ),
            ));
        }
        Ok(bytes)
    }
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// The git object primitives of a remote forge.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; blob uploads run concurrently.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name (e.g., "github", "mock").
    fn name(&self) -> &'static str;

    /// Resolve a branch to the commit it points at.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn resolve_ref(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError>;

    /// Read a commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no commit has this hash
    async fn get_commit(&self, repo: &RepoId, sha: &Oid) -> Result<CommitInfo, ForgeError>;

    /// Store a blob and return its hash.
    ///
    /// # Errors
    ///
    /// - `Rejected` for malformed encoding or oversized payloads
    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: BlobEncoding,
    ) -> Result<Oid, ForgeError>;

    /// Store a tree and return its hash.
    ///
    /// With `base_tree`, entries not named in `entries` are inherited from
    /// the base. Paths may contain `/`; intermediate trees are created.
    ///
    /// # Errors
    ///
    /// - `Rejected` if an entry references an object that does not exist
    async fn create_tree(
        &self,
        repo: &RepoId,
        base_tree: Option<&Oid>,
        entries: &[NewTreeEntry],
    ) -> Result<Oid, ForgeError>;

    /// Store a commit and return its hash.
    async fn create_commit(&self, repo: &RepoId, commit: &NewCommit) -> Result<Oid, ForgeError>;

    /// Move a branch to `new`, fast-forward only.
    ///
    /// `expected` is the commit the caller resolved the branch to. The update
    /// must not succeed if the branch no longer points there; stores that can
    /// only enforce fast-forward rely on `new` having `expected` as its
    /// parent.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the update is not a fast-forward
    /// - `NotFound` if the branch was deleted
    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), ForgeError>;

    /// Create a new ref.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the ref already exists
    async fn create_ref(&self, repo: &RepoId, name: &RefName, sha: &Oid) -> Result<(), ForgeError>;

    /// List a tree (or the tree of a commit).
    async fn read_tree(
        &self,
        repo: &RepoId,
        sha: &Oid,
        recursive: bool,
    ) -> Result<TreeListing, ForgeError>;

    /// Read a file at `branch`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path or branch does not exist, or the path is a
    ///   directory
    async fn read_file(
        &self,
        repo: &RepoId,
        path: &RepoPath,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError>;

    /// Read repository metadata.
    async fn repo_metadata(&self, repo: &RepoId) -> Result<RepoMetadata, ForgeError>;
}
