//! Table Module
//!
//! The handle callers use. Coordinates sanitization, the mutation executor
//! and the query executor over one shared store client.
//!
//! ## Write Path
//! ```text
//! rows (typed / map / Row)
//!   -> entity conversion
//!   -> sanitization (only on *_sanitized calls)
//!   -> validation
//!   -> batch partitioner
//!   -> one transaction per batch, sequentially
//! ```
//!
//! ## Read Path
//! ```text
//! key / filter -> segmented queries until no continuation token -> rows
//! ```
//!
//! ## Concurrency
//! A `Table` holds no mutable state. The client handle is shared through an
//! `Arc` and may serve independent calls concurrently; within one call every
//! store request is awaited before the next is issued.

use std::sync::Arc;

use crate::client::{OperationResult, TableClient};
use crate::config::Config;
use crate::entity::{PropertyMap, Row, TableEntity};
use crate::error::Result;
use crate::executor::{MutationExecutor, QueryExecutor, WriteMode};
use crate::filter::Filter;
use crate::sanitize::{sanitize_row, sanitize_rows, KeySanitizer};

/// A handle to one table in the store
pub struct Table<C> {
    client: Arc<C>,
    config: Config,
}

impl<C> Clone for Table<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: TableClient> Table<C> {
    /// Open a table handle with the given config
    pub fn open(client: Arc<C>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Open a table handle with the default config
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: Config::default(),
        }
    }

    // =========================================================================
    // Table Lifecycle
    // =========================================================================

    /// Create the table; returns false if it already existed
    pub async fn create_if_not_exists(&self) -> Result<bool> {
        let created = self.client.create_table_if_not_exists().await?;
        if created {
            tracing::info!("Created table '{}'", self.config.table_name);
        }
        Ok(created)
    }

    pub async fn delete_table(&self) -> Result<()> {
        self.client.delete_table().await?;
        tracing::info!("Deleted table '{}'", self.config.table_name);
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Unconditional upsert of one row
    pub async fn insert_or_replace(&self, row: Row) -> Result<OperationResult> {
        self.mutations().execute_one(WriteMode::InsertOrReplace, row).await
    }

    /// Sanitize the row's keys, then upsert it
    pub async fn insert_or_replace_sanitized(
        &self,
        mut row: Row,
        sanitizer: &dyn KeySanitizer,
    ) -> Result<OperationResult> {
        sanitize_row(&mut row, sanitizer);
        self.insert_or_replace(row).await
    }

    /// Upsert many rows, replacing existing properties
    pub async fn insert_or_replace_all<I>(&self, rows: I) -> Result<Vec<OperationResult>>
    where
        I: IntoIterator<Item = Row>,
    {
        self.write_all(WriteMode::InsertOrReplace, rows.into_iter().collect(), None)
            .await
    }

    pub async fn insert_or_replace_all_sanitized<I>(
        &self,
        rows: I,
        sanitizer: &dyn KeySanitizer,
    ) -> Result<Vec<OperationResult>>
    where
        I: IntoIterator<Item = Row>,
    {
        self.write_all(WriteMode::InsertOrReplace, rows.into_iter().collect(), Some(sanitizer))
            .await
    }

    /// Upsert many rows, merging into existing properties
    pub async fn insert_all<I>(&self, rows: I) -> Result<Vec<OperationResult>>
    where
        I: IntoIterator<Item = Row>,
    {
        self.write_all(WriteMode::InsertOrMerge, rows.into_iter().collect(), None)
            .await
    }

    pub async fn insert_all_sanitized<I>(
        &self,
        rows: I,
        sanitizer: &dyn KeySanitizer,
    ) -> Result<Vec<OperationResult>>
    where
        I: IntoIterator<Item = Row>,
    {
        self.write_all(WriteMode::InsertOrMerge, rows.into_iter().collect(), Some(sanitizer))
            .await
    }

    /// Delete one row; conditional on its ETag when set
    pub async fn delete(&self, row: Row) -> Result<OperationResult> {
        self.mutations().execute_one(WriteMode::Delete, row).await
    }

    /// Delete many rows in per-partition batches
    pub async fn delete_all<I>(&self, rows: I) -> Result<Vec<OperationResult>>
    where
        I: IntoIterator<Item = Row>,
    {
        self.write_all(WriteMode::Delete, rows.into_iter().collect(), None)
            .await
    }

    pub async fn insert_or_replace_map(&self, map: PropertyMap) -> Result<OperationResult> {
        self.insert_or_replace(Row::from_map(map)?).await
    }

    pub async fn insert_or_replace_entity<T: TableEntity>(&self, entity: &T) -> Result<OperationResult> {
        self.insert_or_replace(Row::from_entity(entity)?).await
    }

    pub async fn insert_or_replace_entity_sanitized<T: TableEntity>(
        &self,
        entity: &T,
        sanitizer: &dyn KeySanitizer,
    ) -> Result<OperationResult> {
        self.insert_or_replace_sanitized(Row::from_entity(entity)?, sanitizer)
            .await
    }

    /// Convert every record first; one bad record fails the call before any I/O
    pub async fn insert_or_replace_entities<T: TableEntity>(
        &self,
        entities: &[T],
    ) -> Result<Vec<OperationResult>> {
        let rows = entities.iter().map(Row::from_entity).collect::<Result<Vec<_>>>()?;
        self.insert_or_replace_all(rows).await
    }

    async fn write_all(
        &self,
        mode: WriteMode,
        mut rows: Vec<Row>,
        sanitizer: Option<&dyn KeySanitizer>,
    ) -> Result<Vec<OperationResult>> {
        if let Some(sanitizer) = sanitizer {
            sanitize_rows(&mut rows, sanitizer)?;
        }
        self.mutations().execute_all(mode, rows).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All rows matching `filter`, across every segment
    pub async fn query(&self, filter: &Filter) -> Result<Vec<Row>> {
        self.queries().execute(Some(filter.clone())).await
    }

    /// Every row in the table
    pub async fn query_all(&self) -> Result<Vec<Row>> {
        self.queries().execute(None).await
    }

    pub async fn query_by_partition(&self, partition_key: &str) -> Result<Vec<Row>> {
        self.queries().by_partition(partition_key).await
    }

    /// Full table scan; may be slow regardless of result size
    pub async fn query_by_row(&self, row_key: &str) -> Result<Vec<Row>> {
        self.queries().by_row(row_key).await
    }

    pub async fn query_by_partition_and_row(&self, partition_key: &str, row_key: &str) -> Result<Option<Row>> {
        self.queries().by_partition_and_row(partition_key, row_key).await
    }

    /// Fetch the whole table, keep rows matching `predicate`, truncate
    pub async fn query_where<P>(&self, predicate: P, max_results: Option<usize>) -> Result<Vec<Row>>
    where
        P: Fn(&Row) -> bool,
    {
        self.queries().matching(predicate, max_results).await
    }

    pub async fn get_map(&self, partition_key: &str, row_key: &str) -> Result<Option<PropertyMap>> {
        Ok(self
            .query_by_partition_and_row(partition_key, row_key)
            .await?
            .map(Row::into_map))
    }

    pub async fn get_entity<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
        self.query_by_partition_and_row(partition_key, row_key)
            .await?
            .map(Row::into_entity)
            .transpose()
    }

    pub async fn query_entities<T: TableEntity>(&self, filter: &Filter) -> Result<Vec<T>> {
        self.query(filter)
            .await?
            .into_iter()
            .map(Row::into_entity)
            .collect()
    }

    // =========================================================================
    // Key-based Deletes
    // =========================================================================

    /// Delete every row in a partition; a no-op if it is empty
    pub async fn delete_by_partition(&self, partition_key: &str) -> Result<Vec<OperationResult>> {
        let rows = self.query_by_partition(partition_key).await?;
        if rows.is_empty() {
            tracing::debug!("{}: partition '{}' is empty, nothing to delete", self.config.table_name, partition_key);
            return Ok(Vec::new());
        }
        self.delete_all(rows).await
    }

    /// Delete every row with `row_key`, one at a time
    ///
    /// Matches may span partitions, so they cannot share a batch.
    pub async fn delete_by_row(&self, row_key: &str) -> Result<Vec<OperationResult>> {
        let rows = self.query_by_row(row_key).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(self.delete(row).await?);
        }
        Ok(results)
    }

    /// Delete one row by key; `None` if it does not exist
    pub async fn delete_by_partition_and_row(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<OperationResult>> {
        match self.query_by_partition_and_row(partition_key, row_key).await? {
            Some(row) => Ok(Some(self.delete(row).await?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn mutations(&self) -> MutationExecutor<'_, C> {
        MutationExecutor::new(
            self.client.as_ref(),
            self.config.max_batch_size,
            &self.config.table_name,
        )
    }

    fn queries(&self) -> QueryExecutor<'_, C> {
        QueryExecutor::new(
            self.client.as_ref(),
            self.config.query_page_size,
            &self.config.table_name,
        )
    }
}
