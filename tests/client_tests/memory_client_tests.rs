//! Tests for MemoryTableClient
//!
//! These tests verify:
//! - Table lifecycle (create, delete, missing table)
//! - ETag/Timestamp assignment and merge vs replace
//! - Delete preconditions
//! - Batch atomicity and shape rules
//! - Segmented queries and continuation tokens

use tablekv::client::{
    ContinuationToken, MemoryTableClient, StoreError, TableClient, TableOperation, TableQuery,
};
use tablekv::{Filter, PropertyValue, Row};

// =============================================================================
// Helper Functions
// =============================================================================

async fn setup_client() -> MemoryTableClient {
    let client = MemoryTableClient::new();
    assert!(client.create_table_if_not_exists().await.unwrap());
    client
}

fn upsert(pk: &str, rk: &str) -> TableOperation {
    TableOperation::InsertOrReplace(Row::new(pk, rk).with_property("v", rk))
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_create_table_is_idempotent() {
    let client = setup_client().await;
    assert!(!client.create_table_if_not_exists().await.unwrap());
}

#[tokio::test]
async fn test_operations_require_table() {
    let client = MemoryTableClient::new();

    assert_eq!(client.execute(upsert("A", "1")).await.unwrap_err(), StoreError::TableNotFound);
    assert_eq!(
        client.execute_query_segment(&TableQuery::default(), None).await.unwrap_err(),
        StoreError::TableNotFound
    );
}

#[tokio::test]
async fn test_delete_table_drops_rows() {
    let client = setup_client().await;
    client.execute(upsert("A", "1")).await.unwrap();

    client.delete_table().await.unwrap();

    assert!(client.is_empty());
    assert_eq!(client.delete_table().await.unwrap_err(), StoreError::TableNotFound);
}

// =============================================================================
// Write Tests
// =============================================================================

#[tokio::test]
async fn test_writes_assign_new_etags() {
    let client = setup_client().await;

    let first = client.execute(upsert("A", "1")).await.unwrap();
    let second = client.execute(upsert("A", "1")).await.unwrap();

    assert_eq!(first.status, 204);
    assert!(first.etag.is_some());
    assert!(first.timestamp.is_some());
    assert_ne!(first.etag, second.etag);
}

#[tokio::test]
async fn test_replace_drops_old_properties() {
    let client = setup_client().await;
    client
        .execute(TableOperation::InsertOrReplace(Row::new("A", "1").with_property("old", 1)))
        .await
        .unwrap();

    client
        .execute(TableOperation::InsertOrReplace(Row::new("A", "1").with_property("new", 2)))
        .await
        .unwrap();

    let stored = &client.snapshot()[0];
    assert!(stored.property("old").is_none());
    assert_eq!(stored.property("new"), Some(&PropertyValue::Int32(2)));
}

#[tokio::test]
async fn test_merge_keeps_old_properties() {
    let client = setup_client().await;
    client
        .execute(TableOperation::InsertOrMerge(Row::new("A", "1").with_property("old", 1)))
        .await
        .unwrap();

    client
        .execute(TableOperation::InsertOrMerge(
            Row::new("A", "1").with_property("new", 2).with_property("old", 3),
        ))
        .await
        .unwrap();

    let stored = &client.snapshot()[0];
    assert_eq!(stored.property("old"), Some(&PropertyValue::Int32(3)));
    assert_eq!(stored.property("new"), Some(&PropertyValue::Int32(2)));
}

#[tokio::test]
async fn test_delete_missing_row_not_found() {
    let client = setup_client().await;

    let err = client.execute(TableOperation::Delete(Row::new("A", "1"))).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_checks_etag() {
    let client = setup_client().await;
    let written = client.execute(upsert("A", "1")).await.unwrap();

    let stale = Row::new("A", "1").with_etag("W/\"stale\"");
    let err = client.execute(TableOperation::Delete(stale)).await.unwrap_err();
    assert!(matches!(err, StoreError::PreconditionFailed { .. }));

    let current = Row::new("A", "1").with_etag(written.etag.unwrap());
    client.execute(TableOperation::Delete(current)).await.unwrap();
    assert!(client.is_empty());
}

#[tokio::test]
async fn test_delete_wildcard_etag_is_unconditional() {
    let client = setup_client().await;
    client.execute(upsert("A", "1")).await.unwrap();

    client
        .execute(TableOperation::Delete(Row::new("A", "1").with_etag("*")))
        .await
        .unwrap();
    assert!(client.is_empty());
}

// =============================================================================
// Batch Tests
// =============================================================================

#[tokio::test]
async fn test_batch_applies_in_order() {
    let client = setup_client().await;

    let results = client
        .execute_batch(vec![upsert("A", "2"), upsert("A", "1"), upsert("A", "3")])
        .await
        .unwrap();

    let keys: Vec<&str> = results.iter().map(|r| r.row_key.as_str()).collect();
    assert_eq!(keys, vec!["2", "1", "3"]);
    assert_eq!(client.len(), 3);
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let client = setup_client().await;

    let err = client
        .execute_batch(vec![
            upsert("A", "1"),
            TableOperation::Delete(Row::new("A", "missing")),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(client.is_empty());
}

#[tokio::test]
async fn test_batch_shape_rules() {
    let client = setup_client().await;

    let too_many: Vec<TableOperation> = (0..101).map(|i| upsert("A", &i.to_string())).collect();
    assert_eq!(client.execute_batch(too_many).await.unwrap_err(), StoreError::BatchTooLarge(101));

    assert_eq!(client.execute_batch(vec![]).await.unwrap_err(), StoreError::EmptyBatch);

    let mixed = vec![upsert("A", "1"), upsert("B", "1")];
    assert!(matches!(
        client.execute_batch(mixed).await.unwrap_err(),
        StoreError::MixedPartitions(_, _)
    ));

    assert!(client.is_empty());
}

#[tokio::test]
async fn test_injected_failure_fires_once() {
    let client = setup_client().await;
    client.inject_batch_failure(1, StoreError::Transport("reset".to_string()));

    client.execute_batch(vec![upsert("A", "1")]).await.unwrap();
    let err = client.execute_batch(vec![upsert("A", "2")]).await.unwrap_err();
    client.execute_batch(vec![upsert("A", "3")]).await.unwrap();

    assert_eq!(err, StoreError::Transport("reset".to_string()));
    assert_eq!(client.len(), 2);
    assert_eq!(client.stats().batch_sizes, vec![1, 1, 1]);
}

// =============================================================================
// Query Tests
// =============================================================================

#[tokio::test]
async fn test_segments_follow_key_order() {
    let client = MemoryTableClient::new().with_page_size(2);
    client.create_table_if_not_exists().await.unwrap();
    for (pk, rk) in [("B", "1"), ("A", "2"), ("A", "1")] {
        client.execute(upsert(pk, rk)).await.unwrap();
    }

    let query = TableQuery::default();
    let first = client.execute_query_segment(&query, None).await.unwrap();
    let keys: Vec<(&str, &str)> = first
        .rows
        .iter()
        .map(|r| (r.partition_key.as_str(), r.row_key.as_str()))
        .collect();
    assert_eq!(keys, vec![("A", "1"), ("A", "2")]);

    let second = client
        .execute_query_segment(&query, first.continuation.clone())
        .await
        .unwrap();
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].partition_key, "B");
    assert!(second.continuation.is_none());
}

#[tokio::test]
async fn test_take_limits_segment() {
    let client = setup_client().await;
    for i in 0..5 {
        client.execute(upsert("A", &i.to_string())).await.unwrap();
    }

    let query = TableQuery {
        filter: None,
        take: Some(3),
    };
    let segment = client.execute_query_segment(&query, None).await.unwrap();

    assert_eq!(segment.rows.len(), 3);
    assert!(segment.continuation.is_some());
}

#[tokio::test]
async fn test_filter_on_property_widens_integers() {
    let client = setup_client().await;
    client
        .execute(TableOperation::InsertOrReplace(Row::new("A", "1").with_property("n", 5)))
        .await
        .unwrap();

    let query = TableQuery {
        filter: Some(Filter::equal("n", 5i64)),
        take: None,
    };
    let segment = client.execute_query_segment(&query, None).await.unwrap();
    assert_eq!(segment.rows.len(), 1);
}

#[tokio::test]
async fn test_raw_filter_unsupported() {
    let client = setup_client().await;

    let query = TableQuery {
        filter: Some(Filter::Raw("n gt 3".to_string())),
        take: None,
    };
    let err = client.execute_query_segment(&query, None).await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedFilter(_)));
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let client = setup_client().await;

    let token = ContinuationToken::from_bytes(vec![1u8, 2, 3, 4, 5, 6]);
    let err = client
        .execute_query_segment(&TableQuery::default(), Some(token))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::InvalidContinuationToken);
}
