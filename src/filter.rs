//! Query filter expressions
//!
//! Only equality comparisons combined with AND are built here. Anything
//! more general is carried as an opaque [`Filter::Raw`] string and handed to
//! the store untouched.
//!
//! ## Rendering
//! ```text
//! (PartitionKey eq 'A') and (RowKey eq 'it''s')
//! ```

use std::fmt;

use chrono::SecondsFormat;

use crate::entity::{PropertyValue, PARTITION_KEY, ROW_KEY};

/// A filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `property eq value`
    Equal { property: String, value: PropertyValue },

    /// Both sides must match
    And(Box<Filter>, Box<Filter>),

    /// Store-native filter text, passed through as-is
    Raw(String),
}

impl Filter {
    pub fn equal(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Filter::Equal {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn partition_key_eq(partition_key: impl Into<String>) -> Self {
        Filter::equal(PARTITION_KEY, PropertyValue::String(partition_key.into()))
    }

    pub fn row_key_eq(row_key: impl Into<String>) -> Self {
        Filter::equal(ROW_KEY, PropertyValue::String(row_key.into()))
    }

    /// Exact key match
    pub fn key_eq(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Filter::partition_key_eq(partition_key).and(Filter::row_key_eq(row_key))
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equal { property, value } => write!(f, "{} eq {}", property, Literal(value)),
            Filter::And(left, right) => write!(f, "({}) and ({})", left, right),
            Filter::Raw(text) => f.write_str(text),
        }
    }
}

/// Literal syntax for a property value inside filter text
struct Literal<'a>(&'a PropertyValue);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            PropertyValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            PropertyValue::Int32(v) => write!(f, "{}", v),
            PropertyValue::Int64(v) => write!(f, "{}L", v),
            PropertyValue::Double(v) => write!(f, "{:?}", v),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Binary(bytes) => {
                f.write_str("X'")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                f.write_str("'")
            }
            PropertyValue::DateTime(ts) => {
                write!(f, "datetime'{}'", ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            PropertyValue::Guid(id) => write!(f, "guid'{}'", id.hyphenated()),
        }
    }
}
