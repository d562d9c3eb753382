//! cli::commands::status
//!
//! Show the configured repository and its remote metadata.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::{runtime, Context};
use crate::core::types::RepoId;
use crate::engine::tree_reader;
use crate::forge::RepoMetadata;
use crate::ui::output;

#[derive(Serialize)]
struct StatusReport<'a> {
    repo: &'a RepoId,
    api_base: &'a str,
    config_file: Option<PathBuf>,
    metadata: &'a RepoMetadata,
}

/// Run the status command.
pub fn status(ctx: &Context) -> Result<()> {
    runtime()?.block_on(status_async(ctx))
}

async fn status_async(ctx: &Context) -> Result<()> {
    let repo = ctx.repo()?;
    let client = ctx.client()?;

    let metadata = tree_reader::repo_metadata(&client, &repo)
        .await
        .with_context(|| format!("failed to read repository {}", repo))?;

    if ctx.json {
        output::json(&StatusReport {
            repo: &repo,
            api_base: ctx.config.api_base(),
            config_file: ctx.config.loaded_from().map(|p| p.to_path_buf()),
            metadata: &metadata,
        })?;
        return Ok(());
    }

    output::print(format!("Repository:     {}", metadata.full_name), ctx.verbosity);
    output::print(format!("Default branch: {}", metadata.default_branch), ctx.verbosity);
    output::print(
        format!(
            "Visibility:     {}",
            if metadata.private { "private" } else { "public" }
        ),
        ctx.verbosity,
    );
    if let Some(pushed_at) = &metadata.pushed_at {
        output::print(
            format!("Last push:      {}", pushed_at.format("%Y-%m-%d %H:%M UTC")),
            ctx.verbosity,
        );
    }
    output::print(format!("URL:            {}", metadata.html_url), ctx.verbosity);
    output::print(format!("API:            {}", ctx.config.api_base()), ctx.verbosity);
    if let Some(path) = ctx.config.loaded_from() {
        output::print(format!("Config:         {}", path.display()), ctx.verbosity);
    }
    Ok(())
}
