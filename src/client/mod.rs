//! Store Client Module
//!
//! The contract consumed from the underlying table store. Transport,
//! credentials and retry policy live behind this trait and are not part of
//! this crate.
//!
//! ## Contract
//! - `execute`: one upsert/merge/delete against one row
//! - `execute_batch`: same-partition operations, at most 100, order
//!   preserving and all-or-nothing per call
//! - `execute_query_segment`: one page of results plus an optional
//!   continuation token; a token means more pages exist
//! - `create_table_if_not_exists` / `delete_table`: table lifecycle

pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entity::Row;
use crate::filter::Filter;

pub use memory::{ClientStats, MemoryTableClient};

/// Result type alias for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("table not found")]
    TableNotFound,

    #[error("row '{partition_key}'/'{row_key}' already exists")]
    Conflict { partition_key: String, row_key: String },

    #[error("row '{partition_key}'/'{row_key}' not found")]
    NotFound { partition_key: String, row_key: String },

    #[error("precondition failed for row '{partition_key}'/'{row_key}'")]
    PreconditionFailed { partition_key: String, row_key: String },

    #[error("batch of {0} operations exceeds the store limit")]
    BatchTooLarge(usize),

    #[error("batch contains no operations")]
    EmptyBatch,

    #[error("batch mixes partitions '{0}' and '{1}'")]
    MixedPartitions(String, String),

    #[error("batch contains row '{partition_key}'/'{row_key}' more than once")]
    DuplicateRow { partition_key: String, row_key: String },

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("invalid continuation token")]
    InvalidContinuationToken,

    #[error("transport error: {0}")]
    Transport(String),
}

/// A single write against one row
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    /// Unconditional upsert replacing all properties
    InsertOrReplace(Row),

    /// Upsert merging properties into an existing row
    InsertOrMerge(Row),

    /// Delete; conditional on the row's ETag when one is set
    Delete(Row),
}

impl TableOperation {
    pub fn row(&self) -> &Row {
        match self {
            TableOperation::InsertOrReplace(row)
            | TableOperation::InsertOrMerge(row)
            | TableOperation::Delete(row) => row,
        }
    }
}

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub partition_key: String,
    pub row_key: String,

    /// HTTP-style status code (204 for success without content)
    pub status: u16,

    /// New concurrency token; `None` after a delete
    pub etag: Option<String>,

    pub timestamp: Option<DateTime<Utc>>,
}

/// A query as sent to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    /// `None` scans the whole table
    pub filter: Option<Filter>,

    /// Max rows per segment
    pub take: Option<u32>,
}

/// Opaque cursor returned by a segmented query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(Bytes);

impl ContinuationToken {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct QuerySegment {
    pub rows: Vec<Row>,

    /// Present while more pages remain
    pub continuation: Option<ContinuationToken>,
}

/// The underlying table store client
///
/// Handles are shared across independent top-level calls, so
/// implementations must be safe for concurrent use.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Execute a single operation
    async fn execute(&self, operation: TableOperation) -> StoreResult<OperationResult>;

    /// Execute same-partition operations as one atomic transaction
    async fn execute_batch(&self, operations: Vec<TableOperation>) -> StoreResult<Vec<OperationResult>>;

    /// Fetch one page of query results
    async fn execute_query_segment(
        &self,
        query: &TableQuery,
        continuation: Option<ContinuationToken>,
    ) -> StoreResult<QuerySegment>;

    /// Create the table; returns false if it already existed
    async fn create_table_if_not_exists(&self) -> StoreResult<bool>;

    async fn delete_table(&self) -> StoreResult<()>;
}
