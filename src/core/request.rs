//! core::request
//!
//! Request structs for the mutating operations.
//!
//! Each operation takes one explicit struct instead of a loose map of
//! fields. Requests are validated locally with [`CommitRequest::validate`]
//! and [`CreateBranchRequest::validate`] before the first remote call, so a
//! malformed request never leaves orphaned objects behind.
//!
//! # Example
//!
//! ```
//! use forgetree::core::request::{CommitRequest, FileChange};
//! use forgetree::core::types::{BranchName, RepoId};
//!
//! let request = CommitRequest {
//!     repo: RepoId::parse("octocat/hello-world").unwrap(),
//!     branch: BranchName::new("main").unwrap(),
//!     message: "Update greeting".to_string(),
//!     changes: vec![FileChange::text("hello.txt", "hi\n").unwrap()],
//! };
//! assert!(request.validate().is_ok());
//! ```

use std::collections::HashSet;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{BranchName, ErrorKind, RepoId, RepoPath, TypeError};

/// Errors from local request validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("commit message cannot be empty")]
    EmptyMessage,

    #[error("commit request contains no changes")]
    NoChanges,

    #[error("path '{0}' appears more than once")]
    DuplicatePath(RepoPath),

    #[error("content for '{path}' is not valid base64: {message}")]
    InvalidBase64 { path: RepoPath, message: String },

    #[error("branch '{0}' cannot be created from itself")]
    SelfBranch(BranchName),

    #[error(transparent)]
    InvalidValue(#[from] TypeError),
}

impl RequestError {
    /// Classify this error. Requests are checked before any remote call, so
    /// a refusal here stands in for the remote's own.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RemoteRejected
    }
}

/// How blob content is transported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlobEncoding {
    /// Plain text, sent as-is
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// Arbitrary bytes, base64 encoded
    #[serde(rename = "base64")]
    Base64,
}

impl BlobEncoding {
    /// Wire name of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobEncoding::Utf8 => "utf-8",
            BlobEncoding::Base64 => "base64",
        }
    }
}

impl std::fmt::Display for BlobEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One desired file state: write `content` at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path
    pub path: RepoPath,
    /// File content, in `encoding`
    pub content: String,
    /// Content encoding
    pub encoding: BlobEncoding,
}

impl FileChange {
    /// A text change. The path is taken literally; see [`RepoPath::literal`].
    pub fn text(path: &str, content: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self {
            path: RepoPath::literal(path)?,
            content: content.into(),
            encoding: BlobEncoding::Utf8,
        })
    }

    /// A binary change. The bytes are base64 encoded for transport.
    pub fn binary(path: &str, bytes: &[u8]) -> Result<Self, TypeError> {
        Ok(Self {
            path: RepoPath::literal(path)?,
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            encoding: BlobEncoding::Base64,
        })
    }

    /// Build a change from raw file bytes, choosing the encoding.
    ///
    /// Valid UTF-8 is sent as text; anything else as base64.
    pub fn from_bytes(path: &str, bytes: Vec<u8>) -> Result<Self, TypeError> {
        match String::from_utf8(bytes) {
            Ok(text) => Self::text(path, text),
            Err(e) => Self::binary(path, e.as_bytes()),
        }
    }

    /// The raw bytes this change writes.
    pub fn bytes(&self) -> Result<Vec<u8>, RequestError> {
        match self.encoding {
            BlobEncoding::Utf8 => Ok(self.content.as_bytes().to_vec()),
            BlobEncoding::Base64 => {
                decode_base64(&self.content).map_err(|e| RequestError::InvalidBase64 {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Decode base64 the way the contents API emits it (line-wrapped).
pub fn decode_base64(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

/// Request to commit a set of changes onto a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// Target repository
    pub repo: RepoId,
    /// Branch to advance
    pub branch: BranchName,
    /// Commit message
    pub message: String,
    /// Files to write
    pub changes: Vec<FileChange>,
}

impl CommitRequest {
    /// Check the request without touching the remote.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage` if the message is blank
    /// - `NoChanges` if there is nothing to commit
    /// - `DuplicatePath` if two changes target the same path
    /// - `InvalidBase64` if base64 content does not decode
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.message.trim().is_empty() {
            return Err(RequestError::EmptyMessage);
        }
        if self.changes.is_empty() {
            return Err(RequestError::NoChanges);
        }

        let mut seen = HashSet::new();
        for change in &self.changes {
            if !seen.insert(&change.path) {
                return Err(RequestError::DuplicatePath(change.path.clone()));
            }
            if change.encoding == BlobEncoding::Base64 {
                change.bytes()?;
            }
        }

        Ok(())
    }
}

/// Request to create a branch from an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBranchRequest {
    /// Target repository
    pub repo: RepoId,
    /// Name of the new branch
    pub name: BranchName,
    /// Branch whose head the new branch starts at
    pub from: BranchName,
}

impl CreateBranchRequest {
    /// Check the request without touching the remote.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.name == self.from {
            return Err(RequestError::SelfBranch(self.name.clone()));
        }
        Ok(())
    }
}
