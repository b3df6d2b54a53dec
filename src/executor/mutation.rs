//! Mutation executor
//!
//! ## Failure Semantics
//! Batches run in order. The first failing batch aborts the call; batches
//! already committed stay committed. The returned
//! [`TableError::BatchExecutionFailed`] reports how many had committed.

use crate::batch::partition;
use crate::client::{OperationResult, TableClient, TableOperation};
use crate::entity::Row;
use crate::error::{Result, TableError};

/// Kind of write applied to every row of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    InsertOrReplace,
    InsertOrMerge,
    Delete,
}

impl WriteMode {
    pub fn operation(self, row: Row) -> TableOperation {
        match self {
            WriteMode::InsertOrReplace => TableOperation::InsertOrReplace(row),
            WriteMode::InsertOrMerge => TableOperation::InsertOrMerge(row),
            WriteMode::Delete => TableOperation::Delete(row),
        }
    }
}

/// Turns rows into single operations or batch transactions
pub struct MutationExecutor<'a, C: ?Sized> {
    client: &'a C,
    max_batch_size: usize,
    table_name: &'a str,
}

impl<'a, C: TableClient + ?Sized> MutationExecutor<'a, C> {
    pub fn new(client: &'a C, max_batch_size: usize, table_name: &'a str) -> Self {
        Self {
            client,
            max_batch_size,
            table_name,
        }
    }

    /// Execute one operation against one row
    pub async fn execute_one(&self, mode: WriteMode, row: Row) -> Result<OperationResult> {
        row.validate()?;

        tracing::trace!(
            "{}: {:?} '{}'/'{}'",
            self.table_name,
            mode,
            row.partition_key,
            row.row_key
        );

        Ok(self.client.execute(mode.operation(row)).await?)
    }

    /// Execute `mode` for every row, one batch transaction per partition chunk
    ///
    /// Results are returned in batch order. An empty input performs no I/O.
    pub async fn execute_all(&self, mode: WriteMode, rows: Vec<Row>) -> Result<Vec<OperationResult>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Reject the whole call before the first transaction
        for row in &rows {
            row.validate()?;
        }

        let row_count = rows.len();
        let batches = partition(rows, self.max_batch_size);
        let batch_count = batches.len();
        let mut results = Vec::with_capacity(row_count);

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let partition_key = batch.partition_key().to_string();

            tracing::debug!(
                "{}: executing {:?} batch {}/{} for partition '{}' ({} rows)",
                self.table_name,
                mode,
                batch_index + 1,
                batch_count,
                partition_key,
                batch.len()
            );

            let operations = batch.into_items().into_iter().map(|row| mode.operation(row)).collect();

            match self.client.execute_batch(operations).await {
                Ok(batch_results) => results.extend(batch_results),
                Err(source) => {
                    tracing::warn!(
                        "{}: batch {}/{} for partition '{}' failed, {} batch(es) already committed: {}",
                        self.table_name,
                        batch_index + 1,
                        batch_count,
                        partition_key,
                        batch_index,
                        source
                    );
                    return Err(TableError::BatchExecutionFailed {
                        batch_index,
                        batch_count,
                        committed_batches: batch_index,
                        partition_key,
                        source,
                    });
                }
            }
        }

        if batch_count > 1 {
            tracing::info!(
                "{}: {:?} of {} rows committed in {} batches",
                self.table_name,
                mode,
                row_count,
                batch_count
            );
        }

        Ok(results)
    }
}
