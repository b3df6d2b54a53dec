//! Batch Partitioner
//!
//! Groups rows by partition key and slices each group into store-legal
//! transaction sizes.
//!
//! ## Ordering
//! - Groups are emitted in the order their key is first seen
//! - Rows keep their input order inside a group
//! - Group membership is by key value, not by input adjacency
//!
//! ```text
//! input:   A1 B1 A2 A3 B2          (max = 2)
//! groups:  [A1 A2 A3] [B1 B2]
//! batches: [A1 A2] [A3] [B1 B2]
//! ```

use std::collections::HashMap;

use crate::entity::Row;

/// Something that belongs to exactly one partition
pub trait Partitioned {
    fn partition_key(&self) -> &str;
}

impl Partitioned for Row {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }
}

/// A non-empty, same-partition slice of the input
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T = Row> {
    partition_key: String,
    items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Split `items` into same-partition batches of at most `max_batch_size`
///
/// A `max_batch_size` of zero is treated as one.
pub fn partition<T: Partitioned>(items: Vec<T>, max_batch_size: usize) -> Vec<Batch<T>> {
    let max_batch_size = max_batch_size.max(1);

    // Stable grouping: index of each key's group in first-seen order
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();

    for item in items {
        let key = item.partition_key();
        match group_index.get(key) {
            Some(&idx) => groups[idx].1.push(item),
            None => {
                let key = key.to_string();
                group_index.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    let mut batches = Vec::new();
    for (partition_key, group) in groups {
        let mut rest = group.into_iter().peekable();
        while rest.peek().is_some() {
            let items: Vec<T> = rest.by_ref().take(max_batch_size).collect();
            batches.push(Batch {
                partition_key: partition_key.clone(),
                items,
            });
        }
    }

    batches
}
