//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and its lifecycle helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Operation attempted after teardown
    #[error("Object has been disposed")]
    Disposed,

    /// Value could not be serialized or deserialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Value could not be compressed or decompressed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// A single entry is larger than the whole memory budget
    #[error("Entry of {size} bytes exceeds memory limit of {max} bytes")]
    EntryTooLarge { size: usize, max: usize },

    /// Setup precondition failed
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Best-effort snapshot could not be written
    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    /// Timers need a running tokio runtime
    #[error("No tokio runtime available to schedule task")]
    NoRuntime,

    /// Invalid argument passed to a lifecycle operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Teardown finished but some children failed to dispose
    #[error("Disposal completed with {} failure(s): {}", .0.len(), .0.join("; "))]
    DisposeFailed(Vec<String>),
}

impl CacheError {
    /// Returns true for errors that `set` reports as a plain failure.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            CacheError::Serialization(_)
                | CacheError::Compression(_)
                | CacheError::EntryTooLarge { .. }
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
