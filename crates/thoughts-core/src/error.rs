//! Core error types for thoughts-core.
//!
//! Uses `thiserror` for structured, matchable error variants. The data model
//! itself is total; these errors cover parsing of user-supplied paths and
//! contexts at the edges of the system.

use thiserror::Error;

/// Core errors produced by the thoughts-core crate.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// A path segment was not of the form `value@rank`.
    #[error("malformed path segment: '{segment}'")]
    MalformedSegment { segment: String },

    /// A rank could not be parsed as a finite number.
    #[error("invalid rank '{raw}' in segment '{segment}'")]
    InvalidRank { segment: String, raw: String },

    /// An operation needed a non-empty path.
    #[error("empty path")]
    EmptyPath,
}
