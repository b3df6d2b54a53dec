//! Untyped map form
//!
//! ## Conversion Rules
//! - map -> row: reserved keys are extracted, everything else becomes a
//!   property. Missing keys default to `""`, a missing `ETag` means no
//!   concurrency check. `null` properties are treated as absent.
//! - row -> map: every property plus the four reserved keys. `Timestamp` is
//!   emitted as an RFC 3339 string, absent metadata as `null`.
//!
//! JSON strings, booleans and numbers round-trip exactly. Arrays of bytes
//! map to binary properties; any other array or nested object is rejected
//! with `UnsupportedPropertyType`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{Result, TableError};

use super::{PropertyValue, Properties, Row, ETAG, PARTITION_KEY, ROW_KEY, TIMESTAMP};

/// Untyped map form of a row
pub type PropertyMap = Map<String, Value>;

impl Row {
    /// Build a row from an untyped map
    pub fn from_map(map: PropertyMap) -> Result<Self> {
        let mut row = Row::new(String::new(), String::new());
        let mut properties = Properties::new();

        for (name, value) in map {
            match name.as_str() {
                PARTITION_KEY => row.partition_key = optional_string(&name, value)?.unwrap_or_default(),
                ROW_KEY => row.row_key = optional_string(&name, value)?.unwrap_or_default(),
                ETAG => row.etag = optional_string(&name, value)?,
                TIMESTAMP => row.timestamp = optional_timestamp(value)?,
                _ => {
                    if value.is_null() {
                        continue;
                    }
                    let property = PropertyValue::from_json(&name, value)?;
                    properties.insert(name, property);
                }
            }
        }

        row.properties = properties;
        Ok(row)
    }

    /// Convert the row back to its untyped map form
    pub fn into_map(self) -> PropertyMap {
        let mut map = PropertyMap::new();

        for (name, value) in self.properties {
            map.insert(name, value.into_json());
        }

        map.insert(PARTITION_KEY.to_string(), Value::String(self.partition_key));
        map.insert(ROW_KEY.to_string(), Value::String(self.row_key));
        map.insert(
            TIMESTAMP.to_string(),
            self.timestamp
                .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
                .unwrap_or(Value::Null),
        );
        map.insert(
            ETAG.to_string(),
            self.etag.map(Value::String).unwrap_or(Value::Null),
        );

        map
    }
}

impl PropertyValue {
    /// Convert one JSON value into a scalar property
    pub fn from_json(name: &str, value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Bool(b) => Ok(PropertyValue::Boolean(b)),
            Value::Number(n) => number_to_property(name, &n),
            Value::Array(items) => bytes_to_property(name, &items),
            other => Err(unsupported(name, &other)),
        }
    }

    /// Convert the property into its JSON form
    ///
    /// Non-finite doubles have no JSON representation and become `null`.
    pub fn into_json(self) -> Value {
        match self {
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::Int32(v) => Value::from(v),
            PropertyValue::Int64(v) => Value::from(v),
            PropertyValue::Double(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
            PropertyValue::Boolean(b) => Value::Bool(b),
            PropertyValue::Binary(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
            PropertyValue::DateTime(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            PropertyValue::Guid(id) => Value::String(id.hyphenated().to_string()),
        }
    }
}

fn number_to_property(name: &str, n: &Number) -> Result<PropertyValue> {
    if let Some(v) = n.as_i64() {
        return Ok(match i32::try_from(v) {
            Ok(small) => PropertyValue::Int32(small),
            Err(_) => PropertyValue::Int64(v),
        });
    }
    if n.is_u64() {
        // above i64::MAX
        return Err(TableError::UnsupportedPropertyType {
            property: name.to_string(),
            kind: "unsigned 64-bit integer".to_string(),
        });
    }
    match n.as_f64() {
        Some(v) => Ok(PropertyValue::Double(v)),
        None => Err(TableError::UnsupportedPropertyType {
            property: name.to_string(),
            kind: format!("number {}", n),
        }),
    }
}

fn bytes_to_property(name: &str, items: &[Value]) -> Result<PropertyValue> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()
        .map(PropertyValue::Binary)
        .ok_or_else(|| TableError::UnsupportedPropertyType {
            property: name.to_string(),
            kind: "array (only byte arrays are supported)".to_string(),
        })
}

fn optional_string(name: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(unsupported(name, &other)),
    }
}

fn optional_timestamp(value: Value) -> Result<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| TableError::InvalidArgument(format!("invalid {} '{}': {}", TIMESTAMP, s, e))),
        other => Err(unsupported(TIMESTAMP, &other)),
    }
}

fn unsupported(name: &str, value: &Value) -> TableError {
    TableError::UnsupportedPropertyType {
        property: name.to_string(),
        kind: json_kind(value).to_string(),
    }
}

pub(super) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
