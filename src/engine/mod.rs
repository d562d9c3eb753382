//! engine
//!
//! Composes [`ObjectStore`](crate::forge::ObjectStore) primitives into
//! higher-level operations.
//!
//! # Architecture
//!
//! ```text
//! commit / scaffold ──> tree_builder ──> forge
//! branch ─────────────────────────────> forge
//! tree_reader ────────────────────────> forge
//! ```
//!
//! - [`tree_builder`]: changes to a new tree, blobs uploaded concurrently
//! - [`commit`]: the staged commit pipeline with fast-forward ref update
//! - [`branch`]: create a branch from another branch's head
//! - [`scaffold`]: a pipeline run with the scaffold message
//! - [`tree_reader`]: tree listings, file reads, repository metadata
//!
//! # Invariants
//!
//! - A branch is only ever moved by a fast-forward update
//! - Requests are validated before the first remote call
//! - No operation retries or cleans up after a failure

pub mod branch;
pub mod commit;
pub mod scaffold;
pub mod tree_builder;
pub mod tree_reader;

pub use branch::{create_branch, BranchError};
pub use commit::{commit, CommitOutcome, CommitPipeline, CommitStage, PipelineError};
pub use scaffold::{scaffold, ScaffoldRequest};
pub use tree_builder::{TreeBuildError, TreeBuilder};
pub use tree_reader::{list_tree, read_file, repo_metadata};
