//! Strongly typed records
//!
//! A record is any serde type whose serialized form is a flat object of
//! scalar fields. Keys and metadata are picked up from fields serialized
//! under the reserved names, e.g. `#[serde(rename = "PartitionKey")]`.
//!
//! serde renders `DateTime` and `Uuid` fields as strings. Records list such
//! fields in [`TableEntity::TYPED_PROPERTIES`] so they are stored as
//! datetime and guid properties rather than plain strings.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, TableError};

use super::map::json_kind;
use super::{KeyCapability, PropertyValue, Row};

/// Store type of a field that serde serializes as a string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedProperty {
    /// RFC 3339 timestamp
    DateTime,

    /// Hyphenated UUID
    Guid,
}

/// A strongly typed record stored as one row
///
/// Records that want their pre-sanitization keys kept declare
/// `KEY_CAPABILITY = KeyCapability::PreserveOriginal` and may expose
/// `UnsanitizedPartitionKey` / `UnsanitizedRowKey` fields to read them back.
pub trait TableEntity: Serialize + DeserializeOwned {
    const KEY_CAPABILITY: KeyCapability = KeyCapability::Plain;

    /// Fields stored as datetime or guid properties, by serialized name
    const TYPED_PROPERTIES: &'static [(&'static str, TypedProperty)] = &[];
}

impl Row {
    /// Convert a typed record into a row
    pub fn from_entity<T: TableEntity>(entity: &T) -> Result<Self> {
        let mut row = match serde_json::to_value(entity)? {
            Value::Object(map) => Row::from_map(map)?.with_capability(T::KEY_CAPABILITY),
            other => {
                return Err(TableError::UnsupportedPropertyType {
                    property: std::any::type_name::<T>().to_string(),
                    kind: format!("record serialized as {} instead of an object", json_kind(&other)),
                })
            }
        };

        for &(name, kind) in T::TYPED_PROPERTIES {
            if let Some(value) = row.properties.get_mut(name) {
                restore_typed(name, kind, value)?;
            }
        }

        Ok(row)
    }

    /// Convert the row into a typed record
    pub fn into_entity<T: TableEntity>(self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.into_map()))?)
    }
}

/// Replace the string form of a datetime or guid field with the typed value
fn restore_typed(name: &str, kind: TypedProperty, value: &mut PropertyValue) -> Result<()> {
    let PropertyValue::String(text) = value else {
        return Ok(());
    };

    let restored = match kind {
        TypedProperty::DateTime => DateTime::parse_from_rfc3339(text)
            .map(|ts| PropertyValue::DateTime(ts.with_timezone(&Utc)))
            .map_err(|e| TableError::InvalidArgument(format!("invalid datetime '{}' in '{}': {}", text, name, e)))?,
        TypedProperty::Guid => Uuid::parse_str(text)
            .map(PropertyValue::Guid)
            .map_err(|e| TableError::InvalidArgument(format!("invalid guid '{}' in '{}': {}", text, name, e)))?,
    };

    *value = restored;
    Ok(())
}
