//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Every command talks to the network. Handlers are synchronous wrappers
//! that build a tokio runtime and block on the async implementation.

mod branch;
mod commit;
mod file;
mod scaffold;
mod status;
mod tree;

pub use branch::branch;
pub use commit::commit;
pub use file::file;
pub use scaffold::scaffold;
pub use status::status;
pub use tree::tree;

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::args::{Command, FileArg};
use crate::core::config::Config;
use crate::core::request::FileChange;
use crate::core::types::{BranchName, RepoId};
use crate::forge::github::GitHubClient;
use crate::ui::output::Verbosity;

/// Everything a handler needs, resolved once per invocation.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// The target repository.
    pub fn repo(&self) -> Result<RepoId> {
        Ok(self.config.repo()?)
    }

    /// An authenticated client for the configured API base.
    pub fn client(&self) -> Result<GitHubClient> {
        let token = self.config.token()?;
        Ok(GitHubClient::with_api_base(token, self.config.api_base()))
    }

    /// `branch` if given, else the configured default branch.
    pub fn branch(&self, branch: Option<&str>) -> Result<BranchName> {
        match branch {
            Some(name) => Ok(BranchName::new(name)?),
            None => Ok(self.config.default_branch()?),
        }
    }
}

/// Read `<repo path>=<local file>` arguments into changes.
pub(crate) fn read_changes(files: &[FileArg]) -> Result<Vec<FileChange>> {
    files
        .iter()
        .map(|arg| {
            let bytes = read_local(&arg.source)?;
            FileChange::from_bytes(&arg.path, bytes)
                .with_context(|| format!("invalid repository path '{}'", arg.path))
        })
        .collect()
}

fn read_local(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
}

/// Build the runtime for an async command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status => status::status(ctx),
        Command::Tree {
            branch,
            no_recursive,
        } => tree::tree(ctx, branch.as_deref(), !no_recursive),
        Command::File { path, branch, raw } => file::file(ctx, &path, branch.as_deref(), raw),
        Command::Commit {
            message,
            branch,
            files,
        } => commit::commit(ctx, &message, branch.as_deref(), &files),
        Command::Branch { name, from } => branch::branch(ctx, &name, from.as_deref()),
        Command::Scaffold {
            branch,
            message,
            files,
        } => scaffold::scaffold(ctx, branch.as_deref(), message.as_deref(), &files),
    }
}
