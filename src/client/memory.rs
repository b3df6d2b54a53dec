//! In-memory table client
//!
//! A complete [`TableClient`] backed by an ordered map, for tests, the CLI
//! and local development.
//!
//! ## Behaviour
//! - Rows are kept ordered by (PartitionKey, RowKey), the order queries return
//! - Batches are validated in full before anything is applied, so a failing
//!   batch leaves the table untouched
//! - Every write assigns a fresh ETag and Timestamp
//! - Query segments hold at most `page_size` rows; continuation tokens encode
//!   the next key with bincode, guarded by a CRC32
//! - Only structured filters are evaluated; `Filter::Raw` is rejected
//!
//! ## Concurrency
//! State lives behind a `parking_lot::RwLock` that is never held across an
//! await point.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::config::MAX_BATCH_SIZE;
use crate::entity::{KeyCapability, PropertyValue, Row, PARTITION_KEY, ROW_KEY};
use crate::filter::Filter;

use super::{
    ContinuationToken, OperationResult, QuerySegment, StoreError, StoreResult, TableClient,
    TableOperation, TableQuery,
};

/// Default rows per query segment, matching common table stores
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Status code for successful writes without a response body
const NO_CONTENT: u16 = 204;

type RowId = (String, String);

/// Counters of calls received, for inspection in tests and tools
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStats {
    pub single_calls: usize,
    pub batch_calls: usize,

    /// Operation count of every batch call, in call order
    pub batch_sizes: Vec<usize>,

    pub segment_calls: usize,
}

struct MemoryState {
    exists: bool,
    rows: BTreeMap<RowId, Row>,
    version: u64,
}

/// Pending one-shot batch failure
struct InjectedFailure {
    remaining_successes: usize,
    error: StoreError,
}

/// In-memory implementation of the store contract
pub struct MemoryTableClient {
    state: RwLock<MemoryState>,
    page_size: usize,
    stats: Mutex<ClientStats>,
    batch_failure: Mutex<Option<InjectedFailure>>,
}

impl MemoryTableClient {
    /// Create a client whose table does not exist yet
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                exists: false,
                rows: BTreeMap::new(),
                version: 0,
            }),
            page_size: DEFAULT_PAGE_SIZE,
            stats: Mutex::new(ClientStats::default()),
            batch_failure: Mutex::new(None),
        }
    }

    /// Set the maximum rows per query segment (at least one)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail one future batch call with `error`
    ///
    /// The next `after_successes` batch calls behave normally; the one after
    /// that returns `error` without applying anything.
    pub fn inject_batch_failure(&self, after_successes: usize, error: StoreError) {
        *self.batch_failure.lock() = Some(InjectedFailure {
            remaining_successes: after_successes,
            error,
        });
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = ClientStats::default();
    }

    /// All stored rows in key order
    pub fn snapshot(&self) -> Vec<Row> {
        self.state.read().rows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn take_injected_failure(&self) -> Option<StoreError> {
        let mut slot = self.batch_failure.lock();
        let failure = slot.as_mut()?;
        if failure.remaining_successes > 0 {
            failure.remaining_successes -= 1;
            return None;
        }
        slot.take().map(|f| f.error)
    }
}

impl Default for MemoryTableClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableClient for MemoryTableClient {
    async fn execute(&self, operation: TableOperation) -> StoreResult<OperationResult> {
        self.stats.lock().single_calls += 1;

        let mut state = self.state.write();
        if !state.exists {
            return Err(StoreError::TableNotFound);
        }

        state.check(&operation)?;
        Ok(state.apply(operation))
    }

    async fn execute_batch(&self, operations: Vec<TableOperation>) -> StoreResult<Vec<OperationResult>> {
        {
            let mut stats = self.stats.lock();
            stats.batch_calls += 1;
            stats.batch_sizes.push(operations.len());
        }

        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }

        let mut state = self.state.write();
        if !state.exists {
            return Err(StoreError::TableNotFound);
        }

        check_batch_shape(&operations)?;
        for operation in &operations {
            state.check(operation)?;
        }

        Ok(operations.into_iter().map(|op| state.apply(op)).collect())
    }

    async fn execute_query_segment(
        &self,
        query: &TableQuery,
        continuation: Option<ContinuationToken>,
    ) -> StoreResult<QuerySegment> {
        self.stats.lock().segment_calls += 1;

        if let Some(filter) = &query.filter {
            ensure_structured(filter)?;
        }

        let state = self.state.read();
        if !state.exists {
            return Err(StoreError::TableNotFound);
        }

        let take = query
            .take
            .map(|t| (t as usize).clamp(1, self.page_size))
            .unwrap_or(self.page_size);

        let start = match continuation {
            Some(token) => Bound::Included(decode_token(&token)?),
            None => Bound::Unbounded,
        };

        let mut iter = state.rows.range((start, Bound::Unbounded)).peekable();
        let mut rows = Vec::new();

        while rows.len() < take {
            let Some((_, row)) = iter.next() else { break };
            if query.filter.as_ref().map_or(true, |f| matches(f, row)) {
                rows.push(row.clone());
            }
        }

        let continuation = match iter.peek() {
            Some((next_id, _)) => Some(encode_token(next_id)?),
            None => None,
        };

        Ok(QuerySegment { rows, continuation })
    }

    async fn create_table_if_not_exists(&self) -> StoreResult<bool> {
        let mut state = self.state.write();
        if state.exists {
            return Ok(false);
        }
        state.exists = true;
        Ok(true)
    }

    async fn delete_table(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.exists {
            return Err(StoreError::TableNotFound);
        }
        state.exists = false;
        state.rows.clear();
        Ok(())
    }
}

// =============================================================================
// Write Path
// =============================================================================

impl MemoryState {
    /// Check an operation's preconditions without applying it
    fn check(&self, operation: &TableOperation) -> StoreResult<()> {
        let TableOperation::Delete(row) = operation else {
            return Ok(());
        };

        let stored = self
            .rows
            .get(&row_id(row))
            .ok_or_else(|| StoreError::NotFound {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            })?;

        match row.etag.as_deref() {
            None | Some("*") => Ok(()),
            Some(etag) if stored.etag.as_deref() == Some(etag) => Ok(()),
            Some(_) => Err(StoreError::PreconditionFailed {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            }),
        }
    }

    /// Apply a checked operation
    fn apply(&mut self, operation: TableOperation) -> OperationResult {
        match operation {
            TableOperation::Delete(row) => {
                self.rows.remove(&row_id(&row));
                OperationResult {
                    partition_key: row.partition_key,
                    row_key: row.row_key,
                    status: NO_CONTENT,
                    etag: None,
                    timestamp: None,
                }
            }
            TableOperation::InsertOrReplace(row) => self.store(row, false),
            TableOperation::InsertOrMerge(row) => self.store(row, true),
        }
    }

    fn store(&mut self, mut row: Row, merge: bool) -> OperationResult {
        self.version += 1;
        let id = row_id(&row);

        if merge {
            if let Some(existing) = self.rows.get(&id) {
                let mut properties = existing.properties.clone();
                properties.append(&mut row.properties);
                row.properties = properties;
            }
        }

        let etag = make_etag(&id, self.version);
        let timestamp = Utc::now();

        row.etag = Some(etag.clone());
        row.timestamp = Some(timestamp);
        row.capability = KeyCapability::Plain;
        self.rows.insert(id.clone(), row);

        OperationResult {
            partition_key: id.0,
            row_key: id.1,
            status: NO_CONTENT,
            etag: Some(etag),
            timestamp: Some(timestamp),
        }
    }
}

fn check_batch_shape(operations: &[TableOperation]) -> StoreResult<()> {
    let first = operations.first().ok_or(StoreError::EmptyBatch)?;

    if operations.len() > MAX_BATCH_SIZE {
        return Err(StoreError::BatchTooLarge(operations.len()));
    }

    let partition_key = &first.row().partition_key;
    let mut seen = HashSet::new();

    for operation in operations {
        let row = operation.row();
        if &row.partition_key != partition_key {
            return Err(StoreError::MixedPartitions(
                partition_key.clone(),
                row.partition_key.clone(),
            ));
        }
        if !seen.insert(row.row_key.as_str()) {
            return Err(StoreError::DuplicateRow {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            });
        }
    }

    Ok(())
}

fn row_id(row: &Row) -> RowId {
    (row.partition_key.clone(), row.row_key.clone())
}

fn make_etag(id: &RowId, version: u64) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(id.0.as_bytes());
    hasher.update(&[0]);
    hasher.update(id.1.as_bytes());
    hasher.update(&version.to_le_bytes());
    format!("W/\"{}-{:08x}\"", version, hasher.finalize())
}

// =============================================================================
// Query Path
// =============================================================================

fn ensure_structured(filter: &Filter) -> StoreResult<()> {
    match filter {
        Filter::Equal { .. } => Ok(()),
        Filter::And(left, right) => {
            ensure_structured(left)?;
            ensure_structured(right)
        }
        Filter::Raw(text) => Err(StoreError::UnsupportedFilter(text.clone())),
    }
}

fn matches(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::Equal { property, value } => match property.as_str() {
            PARTITION_KEY => value.as_str() == Some(row.partition_key.as_str()),
            ROW_KEY => value.as_str() == Some(row.row_key.as_str()),
            name => row.property(name).map_or(false, |stored| values_equal(stored, value)),
        },
        Filter::And(left, right) => matches(left, row) && matches(right, row),
        Filter::Raw(_) => false,
    }
}

fn values_equal(stored: &PropertyValue, expected: &PropertyValue) -> bool {
    match (stored.as_i64(), expected.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => stored == expected,
    }
}

/// Resume position carried by a continuation token
#[derive(Serialize, Deserialize)]
struct TokenPayload {
    partition_key: String,
    row_key: String,
}

fn encode_token(next: &RowId) -> StoreResult<ContinuationToken> {
    let payload = TokenPayload {
        partition_key: next.0.clone(),
        row_key: next.1.clone(),
    };
    let mut bytes = bincode::serialize(&payload).map_err(|e| StoreError::Transport(e.to_string()))?;
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(ContinuationToken::from_bytes(bytes))
}

fn decode_token(token: &ContinuationToken) -> StoreResult<RowId> {
    let bytes = token.as_bytes();
    if bytes.len() < 4 {
        return Err(StoreError::InvalidContinuationToken);
    }

    let (payload, crc) = bytes.split_at(bytes.len() - 4);
    let expected = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
    if crc32fast::hash(payload) != expected {
        return Err(StoreError::InvalidContinuationToken);
    }

    let payload: TokenPayload =
        bincode::deserialize(payload).map_err(|_| StoreError::InvalidContinuationToken)?;
    Ok((payload.partition_key, payload.row_key))
}
