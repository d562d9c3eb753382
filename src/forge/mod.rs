//! forge
//!
//! Object-level access to a remote forge (GitHub today).
//!
//! # Architecture
//!
//! The [`ObjectStore`] trait is the only seam between the engine and the
//! network. The engine composes its primitives into trees, commits and
//! branches; it never issues HTTP itself.
//!
//! # Modules
//!
//! - `traits`: [`ObjectStore`], [`ForgeError`] and the object types
//! - [`github`]: REST implementation over the git data API
//! - [`mock`]: content-addressed in-memory store for deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use forgetree::core::types::{BranchName, RepoId};
//! use forgetree::forge::{github::GitHubClient, ObjectStore};
//!
//! # async fn demo() -> Result<(), forgetree::forge::ForgeError> {
//! let client = GitHubClient::new(std::env::var("GITHUB_TOKEN").unwrap_or_default());
//! let repo = RepoId::parse("octocat/hello-world").unwrap();
//! let head = client.resolve_ref(&repo, &BranchName::new("main").unwrap()).await?;
//! println!("main is at {}", head.short(7));
//! # Ok(())
//! # }
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
