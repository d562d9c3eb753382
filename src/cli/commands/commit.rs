//! cli::commands::commit
//!
//! Commit local files to a branch through the commit pipeline.
//!
//! Ctrl-C cancels the run. If the interrupt arrives after the ref update
//! was sent, the update still completes.

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use super::{read_changes, runtime, Context};
use crate::cli::args::FileArg;
use crate::core::request::CommitRequest;
use crate::core::types::BranchName;
use crate::engine::{CommitOutcome, CommitPipeline};
use crate::ui::output;

/// Run the commit command.
pub fn commit(ctx: &Context, message: &str, branch: Option<&str>, files: &[FileArg]) -> Result<()> {
    runtime()?.block_on(commit_async(ctx, message, branch, files))
}

async fn commit_async(
    ctx: &Context,
    message: &str,
    branch: Option<&str>,
    files: &[FileArg],
) -> Result<()> {
    let request = CommitRequest {
        repo: ctx.repo()?,
        branch: ctx.branch(branch)?,
        message: message.to_string(),
        changes: read_changes(files)?,
    };
    request.validate()?;
    let client = ctx.client()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let pipeline = CommitPipeline::new(&client)
        .with_concurrency(ctx.config.blob_concurrency())
        .with_cancellation(cancel);

    let result = pipeline.run(&request).await;
    interrupt.abort();
    let outcome = result.with_context(|| format!("failed to commit to '{}'", request.branch))?;

    report(ctx, &request.branch, request.changes.len(), &outcome)
}

/// Cancel `token` on Ctrl-C.
pub(crate) fn cancel_on_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

/// Print the result of a pipeline run.
pub(crate) fn report(
    ctx: &Context,
    branch: &BranchName,
    files: usize,
    outcome: &CommitOutcome,
) -> Result<()> {
    if ctx.json {
        output::json(outcome)?;
    } else {
        output::print(
            format!(
                "Committed {} file(s) to '{}': {} -> {}",
                files,
                branch,
                outcome.parent.short(7),
                outcome.commit.short(7)
            ),
            ctx.verbosity,
        );
    }
    Ok(())
}
