//! engine::commit
//!
//! The commit pipeline: apply a set of file changes to a branch as one
//! atomic commit.
//!
//! # Stages
//!
//! ```text
//! ResolvingRef -> ResolvingBaseTree -> BuildingTree -> CreatingCommit
//!     -> UpdatingRef -> Committed
//! ```
//!
//! Any stage may end the run with a failure that names the stage. Nothing
//! is retried and nothing is cleaned up: objects created before a failure
//! are unreferenced and harmless, and the branch is either moved to the new
//! commit or left exactly where it was.
//!
//! # Concurrency
//!
//! Two pipelines against the same branch race. The ref update is
//! fast-forward only and the new commit's sole parent is the head resolved
//! in the first stage, so the loser gets a `Conflict` and the winner's
//! history is intact.
//!
//! # Cancellation
//!
//! The token is checked before every stage, and the remote calls of stages
//! one to four race against it. The ref update is never abandoned once
//! sent, since its outcome would be unknown.
//!
//! # Example
//!
//! ```
//! use forgetree::core::request::{CommitRequest, FileChange};
//! use forgetree::core::types::{BranchName, RepoId};
//! use forgetree::engine::CommitPipeline;
//! use forgetree::forge::mock::MockForge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let repo = RepoId::parse("octocat/hello-world").unwrap();
//! let main = BranchName::new("main").unwrap();
//! forge.commit_files(&repo, &main, &[("a.txt", "1")], "Initial commit").unwrap();
//!
//! let outcome = CommitPipeline::new(&forge)
//!     .run(&CommitRequest {
//!         repo: repo.clone(),
//!         branch: main.clone(),
//!         message: "Bump".to_string(),
//!         changes: vec![FileChange::text("a.txt", "2").unwrap()],
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(forge.branch_head(&repo, &main), Some(outcome.commit));
//! # });
//! ```

use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::tree_builder::{TreeBuildError, TreeBuilder};
use crate::core::request::{CommitRequest, RequestError};
use crate::core::types::Oid;
use crate::forge::{ErrorKind, ForgeError, NewCommit, ObjectStore};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    ResolvingRef,
    ResolvingBaseTree,
    BuildingTree,
    CreatingCommit,
    UpdatingRef,
    Committed,
}

impl std::fmt::Display for CommitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommitStage::ResolvingRef => "resolving ref",
            CommitStage::ResolvingBaseTree => "resolving base tree",
            CommitStage::BuildingTree => "building tree",
            CommitStage::CreatingCommit => "creating commit",
            CommitStage::UpdatingRef => "updating ref",
            CommitStage::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// Errors from the commit pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed validation; nothing was sent.
    #[error("invalid commit request: {0}")]
    Invalid(#[from] RequestError),

    /// A remote call failed.
    #[error("commit failed while {stage}: {source}")]
    Stage {
        stage: CommitStage,
        source: ForgeError,
    },

    /// Tree construction failed.
    #[error("commit failed while building tree: {0}")]
    Tree(#[source] TreeBuildError),

    /// The run was cancelled before `stage` completed.
    #[error("commit cancelled while {stage}")]
    Cancelled { stage: CommitStage },
}

impl PipelineError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Invalid(e) => e.kind(),
            PipelineError::Stage { source, .. } => source.kind(),
            PipelineError::Tree(e) => e.kind(),
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// The stage that failed, if the run got that far.
    pub fn stage(&self) -> Option<CommitStage> {
        match self {
            PipelineError::Invalid(_) => None,
            PipelineError::Stage { stage, .. } | PipelineError::Cancelled { stage } => Some(*stage),
            PipelineError::Tree(_) => Some(CommitStage::BuildingTree),
        }
    }

    /// The remote failure behind this error, if any.
    pub fn forge_error(&self) -> Option<&ForgeError> {
        match self {
            PipelineError::Stage { source, .. } => Some(source),
            PipelineError::Tree(e) => Some(e.forge_error()),
            PipelineError::Invalid(_) | PipelineError::Cancelled { .. } => None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// The new commit, now the head of the branch
    pub commit: Oid,
    /// Tree of the new commit
    pub tree: Oid,
    /// Previous head of the branch
    pub parent: Oid,
    /// Stages passed through, in order
    pub stages: Vec<CommitStage>,
}

/// Drives a [`CommitRequest`] through the stages.
pub struct CommitPipeline<'a> {
    store: &'a dyn ObjectStore,
    builder: TreeBuilder<'a>,
    cancel: CancellationToken,
}

impl<'a> CommitPipeline<'a> {
    /// Create a pipeline with default settings and a fresh token.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            builder: TreeBuilder::new(store),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the maximum number of concurrent blob uploads.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.builder = self.builder.with_concurrency(concurrency);
        self
    }

    /// Use `token` to cancel runs of this pipeline.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// - `Invalid` if the request fails validation (no remote call is made)
    /// - `Stage` / `Tree` naming the stage whose remote call failed
    /// - `Cancelled` if the token fired
    pub async fn run(&self, request: &CommitRequest) -> Result<CommitOutcome, PipelineError> {
        request.validate()?;

        let repo = &request.repo;
        let branch = &request.branch;
        let mut stages = Vec::with_capacity(6);

        let parent = self
            .stage(&mut stages, CommitStage::ResolvingRef, async {
                self.store.resolve_ref(repo, branch).await
            })
            .await?;

        let base = self
            .stage(&mut stages, CommitStage::ResolvingBaseTree, async {
                self.store.get_commit(repo, &parent).await
            })
            .await?;

        self.enter(&mut stages, CommitStage::BuildingTree)?;
        let tree = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(self.cancelled(CommitStage::BuildingTree));
            }
            result = self.builder.build_on_tree(repo, &base.tree, &request.changes) => {
                result.map_err(|e| {
                    warn!(%repo, %branch, stage = %CommitStage::BuildingTree, kind = %e.kind(), error = %e, "commit failed");
                    PipelineError::Tree(e)
                })?
            }
        };

        let new_commit = NewCommit {
            message: request.message.clone(),
            tree: tree.clone(),
            parents: vec![parent.clone()],
        };
        let commit = self
            .stage(&mut stages, CommitStage::CreatingCommit, async {
                self.store.create_commit(repo, &new_commit).await
            })
            .await?;

        // Once sent, the update runs to completion
        self.enter(&mut stages, CommitStage::UpdatingRef)?;
        self.store
            .update_ref(repo, branch, &commit, &parent)
            .await
            .map_err(|source| self.failed(CommitStage::UpdatingRef, source))?;

        stages.push(CommitStage::Committed);
        info!(
            %repo,
            %branch,
            from = %parent.short(7),
            to = %commit.short(7),
            files = request.changes.len(),
            "committed"
        );

        Ok(CommitOutcome {
            commit,
            tree,
            parent,
            stages,
        })
    }

    /// Check for cancellation and record entry into `stage`.
    fn enter(&self, stages: &mut Vec<CommitStage>, stage: CommitStage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(stage));
        }
        debug!(%stage, "entering stage");
        stages.push(stage);
        Ok(())
    }

    /// Enter `stage` and race its remote call against cancellation.
    async fn stage<T>(
        &self,
        stages: &mut Vec<CommitStage>,
        stage: CommitStage,
        call: impl Future<Output = Result<T, ForgeError>>,
    ) -> Result<T, PipelineError> {
        self.enter(stages, stage)?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled(stage)),
            result = call => result.map_err(|source| self.failed(stage, source)),
        }
    }

    fn failed(&self, stage: CommitStage, source: ForgeError) -> PipelineError {
        warn!(%stage, kind = %source.kind(), error = %source, "commit failed");
        PipelineError::Stage { stage, source }
    }

    fn cancelled(&self, stage: CommitStage) -> PipelineError {
        warn!(%stage, "commit cancelled");
        PipelineError::Cancelled { stage }
    }
}

/// Run `request` through a pipeline with default settings.
pub async fn commit(
    store: &dyn ObjectStore,
    request: &CommitRequest,
) -> Result<CommitOutcome, PipelineError> {
    CommitPipeline::new(store).run(request).await
}
