//! Error types for vitalsync
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two outcomes that look like failures are deliberately NOT errors:
//! a version-stamp mismatch on a local read, and a requested type-version
//! the local item does not satisfy. Both surface as `Ok(None)` from the
//! store layers and feed the refresh logic instead.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for vitalsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the synchronization and caching subsystem
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (object store reads/writes)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A required argument was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Index outside the current key range of a view or collection
    #[error("Index {index} out of range: {count} keys")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of keys present
        count: usize,
    },

    /// A key with the same item ID already exists in the collection
    #[error("Duplicate item ID: {0}")]
    DuplicateId(String),

    /// Remote record call failed (server or transport)
    #[error("Remote error: {0}")]
    Remote(String),

    /// A batch download recorded a failure; re-raised by `ensure_success`
    #[error("Batch download failed: {0}")]
    Download(Arc<Error>),

    /// Invariant violation inside the merge/refresh machinery
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    /// The operation observed a cancellation signal and unwound
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation was invoked in a context that cannot support it
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
