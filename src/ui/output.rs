//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, commands emit a single JSON document on stdout
//! instead of the human-readable form.

use std::fmt::Display;

use serde::Serialize;

use crate::forge::{EntryKind, TreeEntry};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a value as pretty JSON (always shown).
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format one tree entry as `mode kind sha\tpath`, like `git ls-tree`.
pub fn format_entry(entry: &TreeEntry) -> String {
    let kind = match entry.kind {
        EntryKind::Blob => "blob",
        EntryKind::Tree => "tree",
        EntryKind::Commit => "commit",
    };
    format!(
        "{} {} {}\t{}",
        entry.mode.as_str(),
        kind,
        entry.sha,
        entry.path
    )
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use crate::forge::FileMode;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn entry_formatting() {
        let entry = TreeEntry {
            path: "src/lib.rs".to_string(),
            mode: FileMode::Regular,
            kind: EntryKind::Blob,
            sha: Oid::new("a".repeat(40)).unwrap(),
            size: Some(3),
        };
        assert_eq!(
            format_entry(&entry),
            format!("100644 blob {}\tsrc/lib.rs", "a".repeat(40))
        );
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "  "), "  a\n  b");
    }
}
