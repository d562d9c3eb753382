//! cli::commands::scaffold
//!
//! Lay down an initial file set as a single commit.

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use super::commit::{cancel_on_interrupt, report};
use super::{read_changes, runtime, Context};
use crate::cli::args::FileArg;
use crate::engine::{self, CommitPipeline, ScaffoldRequest};

/// Run the scaffold command.
pub fn scaffold(
    ctx: &Context,
    branch: Option<&str>,
    message: Option<&str>,
    files: &[FileArg],
) -> Result<()> {
    runtime()?.block_on(scaffold_async(ctx, branch, message, files))
}

async fn scaffold_async(
    ctx: &Context,
    branch: Option<&str>,
    message: Option<&str>,
    files: &[FileArg],
) -> Result<()> {
    let request = ScaffoldRequest {
        repo: ctx.repo()?,
        branch: ctx.branch(branch)?,
        files: read_changes(files)?,
    };
    let branch = request.branch.clone();
    let count = request.files.len();
    let message = message.unwrap_or_else(|| ctx.config.scaffold_message());
    let client = ctx.client()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let pipeline = CommitPipeline::new(&client)
        .with_concurrency(ctx.config.blob_concurrency())
        .with_cancellation(cancel);

    let result = engine::scaffold(&pipeline, request, Some(message)).await;
    interrupt.abort();
    let outcome = result.with_context(|| format!("failed to scaffold '{}'", branch))?;

    report(ctx, &branch, count, &outcome)
}
