//! engine::tree_builder
//!
//! Turns a set of file changes into a new tree layered on a base tree.
//!
//! Blobs are uploaded concurrently, at most `concurrency` at a time, and all
//! of them complete before the tree is assembled. Any blob failure fails the
//! build. Blobs uploaded before the failure stay behind as unreferenced
//! objects, which the remote garbage-collects.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::debug;

use crate::core::config::DEFAULT_BLOB_CONCURRENCY;
use crate::core::request::FileChange;
use crate::core::types::{BranchName, Oid, RepoId, RepoPath};
use crate::forge::{ErrorKind, ForgeError, NewTreeEntry, ObjectStore};

/// Errors from building a tree.
#[derive(Debug, Error)]
pub enum TreeBuildError {
    /// The base branch or its commit could not be read.
    #[error("failed to resolve base '{branch}': {source}")]
    Base {
        branch: BranchName,
        source: ForgeError,
    },

    /// A blob upload failed.
    #[error("failed to create blob for '{path}': {source}")]
    Blob { path: RepoPath, source: ForgeError },

    /// Tree assembly failed.
    #[error("failed to create tree: {source}")]
    Tree { source: ForgeError },
}

impl TreeBuildError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        self.forge_error().kind()
    }

    /// The underlying remote failure.
    pub fn forge_error(&self) -> &ForgeError {
        match self {
            TreeBuildError::Base { source, .. }
            | TreeBuildError::Blob { source, .. }
            | TreeBuildError::Tree { source } => source,
        }
    }
}

/// Builds trees through an [`ObjectStore`].
#[derive(Clone, Copy)]
pub struct TreeBuilder<'a> {
    store: &'a dyn ObjectStore,
    concurrency: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder with the default blob concurrency.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            concurrency: DEFAULT_BLOB_CONCURRENCY,
        }
    }

    /// Set the maximum number of blob uploads in flight. Values below 1 are
    /// treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build a tree from `changes` on top of the tree at the head of
    /// `base_branch`.
    pub async fn build(
        &self,
        repo: &RepoId,
        base_branch: &BranchName,
        changes: &[FileChange],
    ) -> Result<Oid, TreeBuildError> {
        let base = |source| TreeBuildError::Base {
            branch: base_branch.clone(),
            source,
        };

        let head = self
            .store
            .resolve_ref(repo, base_branch)
            .await
            .map_err(base)?;
        let commit = self.store.get_commit(repo, &head).await.map_err(base)?;

        self.build_on_tree(repo, &commit.tree, changes).await
    }

    /// Build a tree from `changes` on top of `base_tree`.
    ///
    /// Every change becomes a regular-file entry (mode `100644`). The result
    /// does not depend on the order of `changes`.
    pub async fn build_on_tree(
        &self,
        repo: &RepoId,
        base_tree: &Oid,
        changes: &[FileChange],
    ) -> Result<Oid, TreeBuildError> {
        debug!(
            %repo,
            base = %base_tree.short(7),
            changes = changes.len(),
            concurrency = self.concurrency,
            "building tree"
        );

        let store = self.store;
        let entries: Vec<NewTreeEntry> = stream::iter(changes)
            .map(|change| async move {
                let sha = store
                    .create_blob(repo, &change.content, change.encoding)
                    .await
                    .map_err(|source| TreeBuildError::Blob {
                        path: change.path.clone(),
                        source,
                    })?;
                Ok::<_, TreeBuildError>(NewTreeEntry::blob(change.path.clone(), sha))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let tree = store
            .create_tree(repo, Some(base_tree), &entries)
            .await
            .map_err(|source| TreeBuildError::Tree { source })?;

        debug!(%repo, tree = %tree.short(7), "tree built");
        Ok(tree)
    }
}
