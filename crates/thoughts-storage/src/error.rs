//! Storage error types for thoughts-storage.
//!
//! [`StorageError`] covers the failure modes of snapshot I/O. The in-memory
//! maps themselves cannot fail.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a snapshot file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot contained rows that cannot coexist.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
