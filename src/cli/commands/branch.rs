//! cli::commands::branch
//!
//! Create a branch from another branch's head.

use anyhow::Result;
use serde_json::json;

use super::{runtime, Context};
use crate::core::request::CreateBranchRequest;
use crate::core::types::BranchName;
use crate::engine;
use crate::ui::output;

/// Run the branch command.
pub fn branch(ctx: &Context, name: &str, from: Option<&str>) -> Result<()> {
    runtime()?.block_on(branch_async(ctx, name, from))
}

async fn branch_async(ctx: &Context, name: &str, from: Option<&str>) -> Result<()> {
    let request = CreateBranchRequest {
        repo: ctx.repo()?,
        name: BranchName::new(name)?,
        from: ctx.branch(from)?,
    };
    let client = ctx.client()?;

    let head = engine::create_branch(&client, &request).await?;

    if ctx.json {
        output::json(&json!({
            "branch": request.name,
            "from": request.from,
            "commit": head,
        }))?;
    } else {
        output::print(
            format!(
                "Created branch '{}' from '{}' at {}",
                request.name,
                request.from,
                head.short(7)
            ),
            ctx.verbosity,
        );
    }
    Ok(())
}
