//! Tests for key-based deletes and table lifecycle
//!
//! These tests verify:
//! - delete_by_partition removes one partition and nothing else
//! - delete_by_row deletes matches one at a time across partitions
//! - delete_by_partition_and_row on present and absent rows
//! - Deletes honour the concurrency token read by the lookup

use std::sync::Arc;

use tablekv::client::{MemoryTableClient, StoreError};
use tablekv::{Row, Table, TableError};

// =============================================================================
// Helper Functions
// =============================================================================

async fn setup_table() -> (Arc<MemoryTableClient>, Table<MemoryTableClient>) {
    let client = Arc::new(MemoryTableClient::new());
    let table = Table::new(Arc::clone(&client));
    table.create_if_not_exists().await.unwrap();
    (client, table)
}

fn rows_in(partition_key: &str, count: usize) -> Vec<Row> {
    (0..count).map(|i| Row::new(partition_key, format!("{:04}", i))).collect()
}

// =============================================================================
// Delete By Partition Tests
// =============================================================================

#[tokio::test]
async fn test_delete_by_partition_leaves_other_partitions() {
    let (client, table) = setup_table().await;
    table.insert_all(rows_in("P", 130)).await.unwrap();
    table.insert_all(rows_in("Q", 5)).await.unwrap();
    client.reset_stats();

    let deleted = table.delete_by_partition("P").await.unwrap();

    assert_eq!(deleted.len(), 130);
    assert_eq!(client.stats().batch_sizes, vec![100, 30]);
    assert!(table.query_by_partition("P").await.unwrap().is_empty());
    assert_eq!(table.query_by_partition("Q").await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_delete_by_partition_empty_is_noop() {
    let (client, table) = setup_table().await;
    table.insert_all(rows_in("Q", 2)).await.unwrap();
    client.reset_stats();

    let deleted = table.delete_by_partition("P").await.unwrap();

    assert!(deleted.is_empty());
    assert_eq!(client.stats().batch_calls, 0);
    assert_eq!(client.len(), 2);
}

// =============================================================================
// Delete By Row Tests
// =============================================================================

#[tokio::test]
async fn test_delete_by_row_deletes_each_match_individually() {
    let (client, table) = setup_table().await;
    table.insert_all(rows_in("A", 3)).await.unwrap();
    table.insert_all(rows_in("B", 3)).await.unwrap();
    table.insert_all(rows_in("C", 1)).await.unwrap();
    client.reset_stats();

    let deleted = table.delete_by_row("0001").await.unwrap();

    let partitions: Vec<&str> = deleted.iter().map(|r| r.partition_key.as_str()).collect();
    assert_eq!(partitions, vec!["A", "B"]);
    assert_eq!(client.stats().single_calls, 2);
    assert_eq!(client.stats().batch_calls, 0);
    assert!(table.query_by_row("0001").await.unwrap().is_empty());
    assert_eq!(client.len(), 5);
}

#[tokio::test]
async fn test_delete_by_row_no_match_is_noop() {
    let (client, table) = setup_table().await;
    table.insert_all(rows_in("A", 2)).await.unwrap();

    assert!(table.delete_by_row("missing").await.unwrap().is_empty());
    assert_eq!(client.len(), 2);
}

// =============================================================================
// Delete By Key Tests
// =============================================================================

#[tokio::test]
async fn test_delete_by_partition_and_row_present() {
    let (client, table) = setup_table().await;
    table.insert_all(rows_in("A", 2)).await.unwrap();

    let result = table.delete_by_partition_and_row("A", "0000").await.unwrap();

    assert_eq!(result.map(|r| r.row_key), Some("0000".to_string()));
    assert_eq!(client.len(), 1);
}

#[tokio::test]
async fn test_delete_by_partition_and_row_absent() {
    let (client, table) = setup_table().await;

    let result = table.delete_by_partition_and_row("A", "0000").await.unwrap();

    assert!(result.is_none());
    assert_eq!(client.stats().single_calls, 0);
}

#[tokio::test]
async fn test_stale_etag_blocks_delete() {
    let (_client, table) = setup_table().await;
    table.insert_or_replace(Row::new("A", "1").with_property("v", 1)).await.unwrap();

    let stale = table.query_by_partition_and_row("A", "1").await.unwrap().unwrap();
    table.insert_or_replace(Row::new("A", "1").with_property("v", 2)).await.unwrap();

    let err = table.delete(stale).await.unwrap_err();
    assert!(matches!(err, TableError::Store(StoreError::PreconditionFailed { .. })));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_table_lifecycle() {
    let client = Arc::new(MemoryTableClient::new());
    let table = Table::new(Arc::clone(&client));

    assert!(matches!(
        table.query_all().await.unwrap_err(),
        TableError::Store(StoreError::TableNotFound)
    ));

    assert!(table.create_if_not_exists().await.unwrap());
    assert!(!table.create_if_not_exists().await.unwrap());

    table.insert_or_replace(Row::new("A", "1")).await.unwrap();
    table.delete_table().await.unwrap();

    assert!(table.create_if_not_exists().await.unwrap());
    assert!(table.query_all().await.unwrap().is_empty());
}
