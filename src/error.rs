// src/error.rs

//! Crate-wide error type.
//!
//! Every failure while loading, validating, or selecting is fatal to the
//! current operation: a failed load yields no Release and a failed select
//! yields no Selection. Errors are returned to the caller unmodified.

use thiserror::Error;

use crate::names::SliceKey;

/// Errors produced while reading a release or building a selection
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while reading the release tree
    #[error("{0}")]
    Io(String),

    /// Declarative-format parse failure, prefixed with the file path
    /// relative to the release root
    #[error("{file}: {reason}")]
    Syntax { file: String, reason: String },

    /// Missing or empty required field, unknown format tag, unrecognized
    /// enum value, or an identifier with illegal characters
    #[error("{0}")]
    Schema(String),

    /// Public key armor failed to decode, or the declared key ID does not
    /// match the decoded fingerprint
    #[error("{0}")]
    Crypto(String),

    /// Invalid option combination on a content path
    #[error("{0}")]
    PathOption(String),

    /// Two slices disagree about the content of a path
    #[error("slices {left} and {right} conflict on {path}")]
    PathConflict {
        left: SliceKey,
        right: SliceKey,
        path: String,
    },

    /// A wildcard path in one slice covers a path claimed by another
    #[error("slices {left} and {right} conflict on {left_path} and {right_path}")]
    GlobConflict {
        left: SliceKey,
        right: SliceKey,
        left_path: String,
        right_path: String,
    },

    /// Invalid, redundant, or dangling essential reference
    #[error("{0}")]
    Dependency(String),

    /// The essential graph contains a loop
    #[error("essential loop detected: {0}")]
    Cycle(String),

    /// The requested selection cannot be honored
    #[error("{0}")]
    Selection(String),
}

/// Result type for release and selection operations
pub type Result<T> = std::result::Result<T, Error>;
