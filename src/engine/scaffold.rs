//! engine::scaffold
//!
//! Scaffold initialization: commit a caller-supplied file set with the
//! configured scaffold message. It is an ordinary pipeline run.

use crate::core::config::DEFAULT_SCAFFOLD_MESSAGE;
use crate::core::request::{CommitRequest, FileChange};
use crate::core::types::{BranchName, RepoId};

use super::commit::{CommitOutcome, CommitPipeline, PipelineError};

/// Files to lay down on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldRequest {
    pub repo: RepoId,
    pub branch: BranchName,
    pub files: Vec<FileChange>,
}

impl ScaffoldRequest {
    /// The commit request this scaffold runs as.
    pub fn into_commit(self, message: &str) -> CommitRequest {
        CommitRequest {
            repo: self.repo,
            branch: self.branch,
            message: message.to_string(),
            changes: self.files,
        }
    }
}

/// Commit the scaffold files with `message`, or the default scaffold message.
pub async fn scaffold(
    pipeline: &CommitPipeline<'_>,
    request: ScaffoldRequest,
    message: Option<&str>,
) -> Result<CommitOutcome, PipelineError> {
    let request = request.into_commit(message.unwrap_or(DEFAULT_SCAFFOLD_MESSAGE));
    pipeline.run(&request).await
}
