//! Entity Module
//!
//! The single internal row representation every operation works on.
//!
//! ## Responsibilities
//! - Carry the two-part key, concurrency token, timestamp and property bag
//! - Convert untyped property maps to rows and back
//! - Convert strongly typed records (serde) to rows and back
//! - Validate keys against the store's key rules before any I/O
//!
//! ## Reserved Names
//! `PartitionKey`, `RowKey`, `Timestamp` and `ETag` are never ordinary
//! properties. They are extracted from (and injected into) maps explicitly.

mod keys;
mod map;
mod record;
mod value;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

pub use keys::{is_disallowed_key_char, validate_key, MAX_KEY_LENGTH};
pub use map::PropertyMap;
pub use record::{TableEntity, TypedProperty};
pub use value::PropertyValue;

// =============================================================================
// Reserved Property Names
// =============================================================================

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";
pub const ETAG: &str = "ETag";

/// Names that can never appear in a row's property bag
pub const RESERVED_PROPERTIES: [&str; 4] = [PARTITION_KEY, ROW_KEY, TIMESTAMP, ETAG];

/// Property holding the partition key as it was before sanitization
pub const UNSANITIZED_PARTITION_KEY: &str = "UnsanitizedPartitionKey";

/// Property holding the row key as it was before sanitization
pub const UNSANITIZED_ROW_KEY: &str = "UnsanitizedRowKey";

/// Returns true for the four reserved names
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

/// Property bag of a row, ordered by name
pub type Properties = BTreeMap<String, PropertyValue>;

/// How a row reacts to key sanitization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyCapability {
    /// Keys are overwritten in place
    #[default]
    Plain,

    /// Original keys are stashed in `UnsanitizedPartitionKey` /
    /// `UnsanitizedRowKey` before the keys are overwritten
    PreserveOriginal,
}

/// A single table row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub partition_key: String,
    pub row_key: String,

    /// Concurrency token assigned by the store; `None` means no check
    pub etag: Option<String>,

    /// Last-modified time assigned by the store
    pub timestamp: Option<DateTime<Utc>>,

    pub properties: Properties,

    pub capability: KeyCapability,
}

impl Row {
    /// Create an empty row with the given keys
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
            timestamp: None,
            properties: Properties::new(),
            capability: KeyCapability::Plain,
        }
    }

    /// Builder-style property setter
    ///
    /// Reserved names are accepted here but rejected by [`Row::validate`]
    /// before the row reaches the store.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style concurrency token setter
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Opt into (or out of) original-key preservation
    pub fn with_capability(mut self, capability: KeyCapability) -> Self {
        self.capability = capability;
        self
    }

    /// Shorthand for `with_capability(KeyCapability::PreserveOriginal)`
    pub fn preserve_original_keys(self) -> Self {
        self.with_capability(KeyCapability::PreserveOriginal)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Partition key as supplied before sanitization, if it was preserved
    pub fn unsanitized_partition_key(&self) -> Option<&str> {
        self.property(UNSANITIZED_PARTITION_KEY).and_then(PropertyValue::as_str)
    }

    /// Row key as supplied before sanitization, if it was preserved
    pub fn unsanitized_row_key(&self) -> Option<&str> {
        self.property(UNSANITIZED_ROW_KEY).and_then(PropertyValue::as_str)
    }

    /// Check keys and property names against the store's rules
    pub fn validate(&self) -> Result<()> {
        validate_key(PARTITION_KEY, &self.partition_key)?;
        validate_key(ROW_KEY, &self.row_key)?;

        if let Some(name) = self.properties.keys().find(|name| is_reserved(name)) {
            return Err(TableError::InvalidArgument(format!(
                "'{}' is reserved and cannot be used as a property name (row '{}'/'{}')",
                name, self.partition_key, self.row_key
            )));
        }

        Ok(())
    }
}

