//! Key Sanitization Module
//!
//! Rewrites partition and row keys before they reach the store.
//!
//! ## Dispatch
//! The row's [`KeyCapability`] is checked once per row:
//! - `Plain`: keys are overwritten with the sanitized values
//! - `PreserveOriginal`: the original keys are stashed as properties first
//!
//! A stash is replaced on every sanitization unless it is non-empty and
//! already sanitizes to the current key, which means the row was sanitized
//! before and its key has not changed since.
//!
//! Sanitizers are expected to be deterministic and free of side effects.

use crate::entity::{
    is_disallowed_key_char, validate_key, KeyCapability, PropertyValue, Row, UNSANITIZED_PARTITION_KEY,
    UNSANITIZED_ROW_KEY,
};
use crate::error::{Result, TableError};

/// A pluggable key rewrite
pub trait KeySanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

impl<F> KeySanitizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, raw: &str) -> String {
        self(raw)
    }
}

/// Replaces every character the store refuses in keys
#[derive(Debug, Clone, Copy)]
pub struct ReplaceDisallowed {
    replacement: char,
}

impl ReplaceDisallowed {
    pub fn new(replacement: char) -> Result<Self> {
        if is_disallowed_key_char(replacement) {
            return Err(TableError::InvalidArgument(format!(
                "replacement character {:?} is itself disallowed in keys",
                replacement
            )));
        }
        Ok(Self { replacement })
    }

    pub fn replacement(&self) -> char {
        self.replacement
    }
}

impl Default for ReplaceDisallowed {
    fn default() -> Self {
        Self { replacement: '_' }
    }
}

impl KeySanitizer for ReplaceDisallowed {
    fn sanitize(&self, raw: &str) -> String {
        raw.chars()
            .map(|c| if is_disallowed_key_char(c) { self.replacement } else { c })
            .collect()
    }
}

/// Sanitize a single key value
pub fn sanitize_key(raw: &str, sanitizer: &dyn KeySanitizer) -> String {
    sanitizer.sanitize(raw)
}

/// Rewrite the keys of one row in place
pub fn sanitize_row(row: &mut Row, sanitizer: &dyn KeySanitizer) {
    if row.capability == KeyCapability::PreserveOriginal {
        let (partition_key, row_key) = (row.partition_key.clone(), row.row_key.clone());
        stash_original(row, UNSANITIZED_PARTITION_KEY, partition_key, sanitizer);
        stash_original(row, UNSANITIZED_ROW_KEY, row_key, sanitizer);
    }

    let partition_key = sanitize_key(&row.partition_key, sanitizer);
    let row_key = sanitize_key(&row.row_key, sanitizer);

    tracing::trace!(
        "Sanitized key '{}'/'{}' -> '{}'/'{}'",
        row.partition_key,
        row.row_key,
        partition_key,
        row_key
    );

    row.partition_key = partition_key;
    row.row_key = row_key;
}

/// Record `current` under `property` unless an existing stash already
/// sanitizes to it
fn stash_original(row: &mut Row, property: &str, current: String, sanitizer: &dyn KeySanitizer) {
    let up_to_date = row
        .property(property)
        .and_then(PropertyValue::as_str)
        .filter(|original| !original.is_empty())
        .map_or(false, |original| sanitize_key(original, sanitizer) == current);

    if !up_to_date {
        row.properties
            .insert(property.to_string(), PropertyValue::String(current));
    }
}

/// Sanitize and validate every row of a collection
///
/// All rows are rewritten and checked before anything is returned, so a
/// single bad key rejects the whole collection before any I/O happens.
pub fn sanitize_rows(rows: &mut [Row], sanitizer: &dyn KeySanitizer) -> Result<()> {
    for row in rows.iter_mut() {
        sanitize_row(row, sanitizer);
    }

    for row in rows.iter() {
        validate_key("sanitized PartitionKey", &row.partition_key)?;
        validate_key("sanitized RowKey", &row.row_key)?;
    }

    Ok(())
}
