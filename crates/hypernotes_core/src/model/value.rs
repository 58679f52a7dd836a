//! Field values held by a record.
//!
//! # Responsibility
//! - Define the closed set of value kinds a record field may hold.
//! - Encode and decode values against the JSON persistence format.
//!
//! # Invariants
//! - Every variant except non-finite floats has a JSON representation.
//! - Timestamps nested in user fields round-trip through a tagged object
//!   `{"$timestamp": "..."}`; user maps may not use that key themselves.

use crate::model::error::{DecodeError, SerializationError};
use crate::model::timestamp::{format_timestamp, parse_timestamp, Timestamp};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Object key marking an encoded nested timestamp.
pub const TIMESTAMP_TAG: &str = "$timestamp";

/// Insertion-ordered field mapping.
pub type Fields = IndexMap<String, FieldValue>;

/// One value in a record's open field mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(Fields),
    Timestamp(Timestamp),
}

impl FieldValue {
    /// Short name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Checks that this value can be written, reporting the dotted path of
    /// the first offending leaf relative to `path`.
    pub fn validate_at(&self, path: &str) -> Result<(), SerializationError> {
        match self {
            Self::Float(value) if !value.is_finite() => Err(SerializationError::NonFiniteFloat {
                path: path.to_string(),
                value: *value,
            }),
            Self::List(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(index, item)| item.validate_at(&format!("{path}[{index}]"))),
            Self::Map(fields) => validate_fields(fields, path),
            _ => Ok(()),
        }
    }

    /// Encodes this value as JSON.
    pub fn to_json(&self) -> Result<Value, SerializationError> {
        self.validate_at("$")?;
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a JSON value, restoring tagged timestamps.
    ///
    /// Integers outside the `i64` range decode as floats.
    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => number_to_value(&number),
            Value::String(value) => Self::Text(value),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => {
                if let Some(raw) = tagged_timestamp(&map) {
                    return Ok(Self::Timestamp(parse_timestamp(raw)?));
                }
                Self::Map(
                    map.into_iter()
                        .map(|(key, value)| Ok((key, Self::from_json(value)?)))
                        .collect::<Result<_, DecodeError>>()?,
                )
            }
        })
    }
}

/// Validates every entry of a mapping under `path`.
pub fn validate_fields(fields: &Fields, path: &str) -> Result<(), SerializationError> {
    fields.iter().try_for_each(|(key, value)| {
        let nested = join_path(path, key);
        if key == TIMESTAMP_TAG {
            return Err(SerializationError::ReservedKey { path: nested });
        }
        value.validate_at(&nested)
    })
}

/// Returns the raw timestamp text if `map` is an encoded nested timestamp.
pub fn tagged_timestamp(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(TIMESTAMP_TAG).and_then(Value::as_str)
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn number_to_value(number: &Number) -> FieldValue {
    match number.as_i64() {
        Some(value) => FieldValue::Int(value),
        None => FieldValue::Float(number.as_f64().unwrap_or(f64::NAN)),
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Self::Float(value) => Err(S::Error::custom(format!(
                "non-finite float `{value}` has no JSON representation"
            ))),
            Self::Text(value) => serializer.serialize_str(value),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(fields) if fields.contains_key(TIMESTAMP_TAG) => Err(S::Error::custom(
                format!("map key `{TIMESTAMP_TAG}` is reserved for timestamps"),
            )),
            Self::Map(fields) => fields.serialize(serializer),
            Self::Timestamp(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TIMESTAMP_TAG, &format_timestamp(value))?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Fields> for FieldValue {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
