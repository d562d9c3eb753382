//! cli::commands::tree
//!
//! List the tree of a branch.

use anyhow::{Context as _, Result};

use super::{runtime, Context};
use crate::engine::tree_reader;
use crate::ui::output;

/// Run the tree command.
pub fn tree(ctx: &Context, branch: Option<&str>, recursive: bool) -> Result<()> {
    runtime()?.block_on(tree_async(ctx, branch, recursive))
}

async fn tree_async(ctx: &Context, branch: Option<&str>, recursive: bool) -> Result<()> {
    let repo = ctx.repo()?;
    let branch = ctx.branch(branch)?;
    let client = ctx.client()?;

    let listing = tree_reader::list_tree(&client, &repo, &branch, recursive)
        .await
        .with_context(|| format!("failed to list '{}'", branch))?;

    if ctx.json {
        output::json(&listing)?;
        return Ok(());
    }

    for entry in &listing.entries {
        output::print(output::format_entry(entry), ctx.verbosity);
    }
    Ok(())
}
