//! Error types for partdir
//!
//! Provides a unified error type for all directory and store operations.

use thiserror::Error;

/// Result type alias using PartdirError
pub type Result<T> = std::result::Result<T, PartdirError>;

/// Unified error type for partdir operations
#[derive(Debug, Error)]
pub enum PartdirError {
    // -------------------------------------------------------------------------
    // Directory Errors
    // -------------------------------------------------------------------------
    /// Index unclaimed, slot is a hole, or no partition carries the id
    #[error("Partition not found")]
    NotFound,

    #[error("Partition directory full (capacity {capacity})")]
    Full { capacity: u8 },

    /// A stored value exists but has the wrong size or shape
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The persisted map contradicts the static configuration
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store log corruption detected: {0}")]
    StoreCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PartdirError {
    /// True for failures that originate in the underlying key-value store
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            PartdirError::Store(_) | PartdirError::Io(_) | PartdirError::StoreCorruption(_)
        )
    }

    /// True for outcomes a caller is expected to handle in normal operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PartdirError::NotFound | PartdirError::Full { .. })
    }
}

impl From<bincode::Error> for PartdirError {
    fn from(e: bincode::Error) -> Self {
        PartdirError::Serialization(e.to_string())
    }
}
