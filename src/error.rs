//! Error types for tablekv
//!
//! Provides a unified error type for all table operations. Failures reported
//! by the underlying store client are carried as [`StoreError`].

use thiserror::Error;

use crate::client::StoreError;

/// Result type alias using TableError
pub type Result<T> = std::result::Result<T, TableError>;

/// Unified error type for tablekv operations
#[derive(Debug, Error)]
pub enum TableError {
    // -------------------------------------------------------------------------
    // Argument Errors (raised before any I/O)
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Conversion Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported type for property '{property}': {kind}")]
    UnsupportedPropertyType { property: String, kind: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// A batch transaction failed. Batches before `batch_index` are already
    /// committed and are not rolled back.
    #[error(
        "Batch {batch_index} of {batch_count} (partition '{partition_key}') failed \
         after {committed_batches} committed batch(es): {source}"
    )]
    BatchExecutionFailed {
        batch_index: usize,
        batch_count: usize,
        committed_batches: usize,
        partition_key: String,
        #[source]
        source: StoreError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        TableError::Serialization(err.to_string())
    }
}
