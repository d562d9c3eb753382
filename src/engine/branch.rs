//! engine::branch
//!
//! Branch creation: point a new ref at the head of an existing branch.

use thiserror::Error;
use tracing::{info, warn};

use crate::core::request::{CreateBranchRequest, RequestError};
use crate::core::types::{BranchName, Oid, RefName};
use crate::forge::{ErrorKind, ForgeError, ObjectStore};

/// Errors from branch creation.
#[derive(Debug, Error)]
pub enum BranchError {
    #[error("invalid branch request: {0}")]
    Invalid(#[from] RequestError),

    #[error("failed to resolve source branch '{branch}': {source}")]
    Resolve {
        branch: BranchName,
        source: ForgeError,
    },

    #[error("failed to create branch '{branch}': {source}")]
    Create {
        branch: BranchName,
        source: ForgeError,
    },
}

impl BranchError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BranchError::Invalid(e) => e.kind(),
            BranchError::Resolve { source, .. } | BranchError::Create { source, .. } => {
                source.kind()
            }
        }
    }
}

/// Create `request.name` at the current head of `request.from`.
///
/// Returns the commit the new branch points at.
///
/// # Errors
///
/// - `Resolve` with kind `NotFound` if `from` does not exist
/// - `Create` with kind `Conflict` if `name` already exists
pub async fn create_branch(
    store: &dyn ObjectStore,
    request: &CreateBranchRequest,
) -> Result<Oid, BranchError> {
    request.validate()?;
    let repo = &request.repo;

    let head = store
        .resolve_ref(repo, &request.from)
        .await
        .map_err(|source| BranchError::Resolve {
            branch: request.from.clone(),
            source,
        })?;

    let refname = RefName::for_branch(&request.name);
    if let Err(source) = store.create_ref(repo, &refname, &head).await {
        warn!(%repo, branch = %request.name, kind = %source.kind(), "branch creation failed");
        return Err(BranchError::Create {
            branch: request.name.clone(),
            source,
        });
    }

    info!(%repo, branch = %request.name, from = %request.from, at = %head.short(7), "branch created");
    Ok(head)
}
