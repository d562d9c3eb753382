//! cli
//!
//! Command-line interface layer for forgetree.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve configuration (file, environment, flags)
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a
//! [`commands::Context`] and dispatches to a handler that calls into
//! [`crate::engine`].

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};

use crate::core::config::{Config, Overrides};
use crate::ui::output::Verbosity;

/// Run the CLI application with already-parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load()
        .context("failed to load configuration")?
        .with_overrides(Overrides {
            owner: cli.owner,
            repo: cli.repo,
            api_base: cli.api_base,
        })
        .context("invalid command-line option")?;

    let ctx = commands::Context {
        config,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}
