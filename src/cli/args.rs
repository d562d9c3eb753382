//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--owner` / `--repo`: Target repository (override config and env)
//! - `--api-base`: API base URL (GitHub Enterprise)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ft - atomic multi-file commits against GitHub's git data API
#[derive(Parser, Debug)]
#[command(name = "ft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository owner (overrides config and GITHUB_OWNER)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Repository name (overrides config and GITHUB_REPO)
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// A `<repo path>=<local file>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    /// Destination path in the repository
    pub path: String,
    /// Local file to read the content from
    pub source: PathBuf,
}

fn parse_file_arg(s: &str) -> Result<FileArg, String> {
    match s.split_once('=') {
        Some((path, source)) if !path.is_empty() && !source.is_empty() => Ok(FileArg {
            path: path.to_string(),
            source: PathBuf::from(source),
        }),
        _ => Err(format!(
            "expected <repo path>=<local file>, got '{}'",
            s
        )),
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the configured repository and its metadata
    Status,

    /// List the tree of a branch
    Tree {
        /// Branch to list (defaults to the configured default branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Only list the top level
        #[arg(long)]
        no_recursive: bool,
    },

    /// Print a file from a branch
    File {
        /// Path in the repository
        path: String,

        /// Branch to read from
        #[arg(short, long)]
        branch: Option<String>,

        /// Write the raw bytes to stdout
        #[arg(long)]
        raw: bool,
    },

    /// Commit local files to a branch in one atomic commit
    #[command(after_help = "\
EXAMPLES:
    # Replace two files on main
    ft commit -m \"Update docs\" README.md=./README.md docs/guide.md=./guide.md

    # Commit to another branch
    ft commit -m \"WIP\" --branch feature/x src/lib.rs=./lib.rs")]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch to advance
        #[arg(short, long)]
        branch: Option<String>,

        /// Files as <repo path>=<local file>
        #[arg(required = true, value_name = "PATH=FILE", value_parser = parse_file_arg)]
        files: Vec<FileArg>,
    },

    /// Create a branch from another branch's head
    Branch {
        /// Name of the new branch
        name: String,

        /// Branch to start from
        #[arg(long)]
        from: Option<String>,
    },

    /// Commit an initial file set with the scaffold message
    Scaffold {
        /// Branch to advance
        #[arg(short, long)]
        branch: Option<String>,

        /// Override the configured scaffold message
        #[arg(short, long)]
        message: Option<String>,

        /// Files as <repo path>=<local file>
        #[arg(required = true, value_name = "PATH=FILE", value_parser = parse_file_arg)]
        files: Vec<FileArg>,
    },
}
