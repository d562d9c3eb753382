//! cli::commands::file
//!
//! Print a file from a branch.

use std::io::Write;

use anyhow::{Context as _, Result};

use super::{runtime, Context};
use crate::core::types::RepoPath;
use crate::engine::tree_reader;
use crate::ui::output;

/// Run the file command.
pub fn file(ctx: &Context, path: &str, branch: Option<&str>, raw: bool) -> Result<()> {
    runtime()?.block_on(file_async(ctx, path, branch, raw))
}

async fn file_async(ctx: &Context, path: &str, branch: Option<&str>, raw: bool) -> Result<()> {
    let repo = ctx.repo()?;
    let branch = ctx.branch(branch)?;
    let path = RepoPath::new(path)?;
    let client = ctx.client()?;

    let content = tree_reader::read_file(&client, &repo, &path, &branch)
        .await
        .with_context(|| format!("failed to read '{}' on '{}'", path, branch))?;

    if ctx.json {
        output::json(&content)?;
        return Ok(());
    }

    let bytes = content.decoded()?;
    if raw {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    } else {
        output::print(String::from_utf8_lossy(&bytes), ctx.verbosity);
    }
    Ok(())
}
