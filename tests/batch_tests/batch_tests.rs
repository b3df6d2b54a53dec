//! Tests for the batch partitioner
//!
//! These tests verify:
//! - Chunk counts and sizes for single-partition input
//! - Partitions never mix within a batch
//! - Stable first-seen group order and intra-group order
//! - Empty and single-row edge cases

use tablekv::batch::{partition, Batch};
use tablekv::{Row, MAX_BATCH_SIZE};

// =============================================================================
// Helper Functions
// =============================================================================

fn rows_in(partition_key: &str, count: usize) -> Vec<Row> {
    (0..count).map(|i| Row::new(partition_key, i.to_string())).collect()
}

fn row_keys(batch: &Batch) -> Vec<String> {
    batch.items().iter().map(|r| r.row_key.clone()).collect()
}

// =============================================================================
// Size Tests
// =============================================================================

#[test]
fn test_250_rows_make_three_batches() {
    let batches = partition(rows_in("A", 250), MAX_BATCH_SIZE);

    let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
}

#[test]
fn test_batch_count_is_ceiling() {
    for n in [1usize, 99, 100, 101, 200, 201, 999] {
        let batches = partition(rows_in("A", n), MAX_BATCH_SIZE);
        assert_eq!(batches.len(), (n + MAX_BATCH_SIZE - 1) / MAX_BATCH_SIZE, "n = {}", n);
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= MAX_BATCH_SIZE));
    }
}

#[test]
fn test_concatenation_preserves_order() {
    let input = rows_in("A", 230);
    let expected: Vec<String> = input.iter().map(|r| r.row_key.clone()).collect();

    let flattened: Vec<String> = partition(input, MAX_BATCH_SIZE)
        .into_iter()
        .flat_map(Batch::into_items)
        .map(|r| r.row_key)
        .collect();

    assert_eq!(flattened, expected);
}

#[test]
fn test_custom_batch_size() {
    let sizes: Vec<usize> = partition(rows_in("A", 7), 3).iter().map(Batch::len).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn test_zero_batch_size_treated_as_one() {
    assert_eq!(partition(rows_in("A", 3), 0).len(), 3);
}

// =============================================================================
// Grouping Tests
// =============================================================================

#[test]
fn test_interleaved_partitions_never_mix() {
    let input: Vec<Row> = (0..300)
        .map(|i| Row::new(["A", "B", "C"][i % 3], i.to_string()))
        .collect();

    let batches = partition(input, MAX_BATCH_SIZE);

    assert_eq!(batches.len(), 3);
    for batch in &batches {
        assert!(batch.items().iter().all(|r| r.partition_key == batch.partition_key()));
    }
}

#[test]
fn test_groups_in_first_seen_order() {
    let input = vec![
        Row::new("B", "1"),
        Row::new("A", "1"),
        Row::new("B", "2"),
        Row::new("C", "1"),
        Row::new("A", "2"),
    ];

    let batches = partition(input, MAX_BATCH_SIZE);
    let keys: Vec<&str> = batches.iter().map(|b| b.partition_key()).collect();

    assert_eq!(keys, vec!["B", "A", "C"]);
    assert_eq!(row_keys(&batches[0]), vec!["1", "2"]);
    assert_eq!(row_keys(&batches[1]), vec!["1", "2"]);
}

#[test]
fn test_non_contiguous_rows_are_grouped() {
    let input = vec![Row::new("A", "1"), Row::new("B", "1"), Row::new("A", "2")];

    let batches = partition(input, 2);

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].partition_key(), "A");
    assert_eq!(row_keys(&batches[0]), vec!["1", "2"]);
}

#[test]
fn test_chunks_follow_their_group() {
    let mut input = rows_in("A", 150);
    input.extend(rows_in("B", 20));

    let batches = partition(input, MAX_BATCH_SIZE);
    let shape: Vec<(&str, usize)> = batches.iter().map(|b| (b.partition_key(), b.len())).collect();

    assert_eq!(shape, vec![("A", 100), ("A", 50), ("B", 20)]);
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn test_empty_input() {
    assert!(partition(Vec::<Row>::new(), MAX_BATCH_SIZE).is_empty());
}

#[test]
fn test_single_row() {
    let batches = partition(vec![Row::new("A", "1")], MAX_BATCH_SIZE);

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0].partition_key(), "A");
}
