//! Query executor
//!
//! Results are materialized eagerly: every segment is fetched and buffered
//! before anything is returned. Unbounded result sets are held in memory in
//! full.

use crate::client::{TableClient, TableQuery};
use crate::entity::Row;
use crate::error::{Result, TableError};
use crate::filter::Filter;

/// Builds key filters and follows continuation tokens to completion
pub struct QueryExecutor<'a, C: ?Sized> {
    client: &'a C,
    page_size: Option<u32>,
    table_name: &'a str,
}

impl<'a, C: TableClient + ?Sized> QueryExecutor<'a, C> {
    pub fn new(client: &'a C, page_size: Option<u32>, table_name: &'a str) -> Self {
        Self {
            client,
            page_size,
            table_name,
        }
    }

    /// Fetch every row matching `filter` (`None` scans the whole table)
    pub async fn execute(&self, filter: Option<Filter>) -> Result<Vec<Row>> {
        let query = TableQuery {
            filter,
            take: self.page_size,
        };

        let mut rows = Vec::new();
        let mut continuation = None;
        let mut segments = 0usize;

        loop {
            let segment = self.client.execute_query_segment(&query, continuation.take()).await?;
            segments += 1;

            tracing::debug!(
                "{}: segment {} returned {} rows (more: {})",
                self.table_name,
                segments,
                segment.rows.len(),
                segment.continuation.is_some()
            );

            rows.extend(segment.rows);

            match segment.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(rows)
    }

    pub async fn by_partition(&self, partition_key: &str) -> Result<Vec<Row>> {
        self.execute(Some(Filter::partition_key_eq(partition_key))).await
    }

    /// Rows with `row_key` in any partition
    ///
    /// This is a full table scan on partition-first stores.
    pub async fn by_row(&self, row_key: &str) -> Result<Vec<Row>> {
        self.execute(Some(Filter::row_key_eq(row_key))).await
    }

    /// Point lookup; `None` when no row matches
    pub async fn by_partition_and_row(&self, partition_key: &str, row_key: &str) -> Result<Option<Row>> {
        let rows = self.execute(Some(Filter::key_eq(partition_key, row_key))).await?;
        Ok(rows.into_iter().next())
    }

    /// Scan the whole table and filter client-side
    ///
    /// Expensive: every row is fetched before `predicate` runs. Intended for
    /// small tables and exploration.
    pub async fn matching<P>(&self, predicate: P, max_results: Option<usize>) -> Result<Vec<Row>>
    where
        P: Fn(&Row) -> bool,
    {
        if max_results == Some(0) {
            return Err(TableError::InvalidArgument(
                "max_results must be positive when given".to_string(),
            ));
        }

        let rows = self.execute(None).await?;
        let limit = max_results.unwrap_or(usize::MAX);

        Ok(rows.into_iter().filter(|row| predicate(row)).take(limit).collect())
    }
}
