//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing text goes through this module. Diagnostic logging goes
//! through `tracing` and is controlled separately by `RUST_LOG`/`--debug`.

pub mod output;
