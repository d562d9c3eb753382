//! forgetree - atomic multi-file commits against a remote git object store
//!
//! forgetree turns a set of file changes into exactly one new commit on a
//! remote branch, without a local clone. Blobs, a tree layered on the
//! branch's current tree, and a commit are created through the host's
//! git-data API, and the branch ref is advanced only if nobody else moved
//! it in the meantime.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - The commit pipeline, tree building, branch creation and reads
//! - [`core`] - Domain types, request validation and configuration
//! - [`forge`] - The object store abstraction, the GitHub client and a mock
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. A commit run produces zero or one commit on the target branch
//! 2. The branch is never moved to a commit that does not descend from
//!    the head observed at the start of the run
//! 3. A run cancelled before the ref update leaves the branch untouched

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod ui;
