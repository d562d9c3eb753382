//! core
//!
//! Core domain types, request schemas and configuration for forgetree.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName, RepoId, RepoPath
//! - [`request`] - Validated request structs for each mutating operation
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Requests are validated before any remote call is made
//! - Schemas are strict and self-describing

pub mod config;
pub mod request;
pub mod types;
