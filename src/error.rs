//! Error types for FractalKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FractalError
pub type Result<T> = std::result::Result<T, FractalError>;

/// Unified error type for FractalKV operations
#[derive(Debug, Error)]
pub enum FractalError {
    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key type: {0}")]
    InvalidKeyType(String),

    #[error("The key should not be empty")]
    EmptyKey,

    #[error("Key already exists: {0}")]
    KeyAlreadyExists(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Collection Errors
    // -------------------------------------------------------------------------
    #[error("Type mismatch for collection `{collection}`: bound to {expected}, got {found}")]
    TypeMismatch {
        collection: String,
        expected: String,
        found: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt file {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Scan Errors
    // -------------------------------------------------------------------------
    #[error("Branch scan timed out after {0} ms")]
    Timeout(u64),

    #[error("Scan worker failed: {0}")]
    Worker(String),

    // -------------------------------------------------------------------------
    // Aggregation Errors
    // -------------------------------------------------------------------------
    #[error("Aggregate has no observations")]
    EmptyAggregate,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FractalError {
    /// Structural failures: the store could not be read or written.
    ///
    /// These are never retried by the engine.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            FractalError::Io(_)
                | FractalError::CorruptFile { .. }
                | FractalError::Timeout(_)
                | FractalError::Worker(_)
        )
    }
}

impl From<serde_json::Error> for FractalError {
    fn from(err: serde_json::Error) -> Self {
        FractalError::Serialization(err.to_string())
    }
}
