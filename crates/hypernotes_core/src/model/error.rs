//! Error types for record construction, mutation and encoding.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// A record (or one of its values) has no representation in the JSON
/// persistence format.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializationError {
    /// NaN and infinities have no JSON encoding.
    NonFiniteFloat { path: String, value: f64 },
    /// User maps may not use the key reserved for nested timestamps.
    ReservedKey { path: String },
    /// Two field paths flatten to the same table column.
    ColumnCollision { column: String },
    /// Encoder-level failure reported by `serde_json`.
    Encode(String),
}

impl Display for SerializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteFloat { path, value } => {
                write!(f, "value `{value}` at `{path}` cannot be serialized")
            }
            Self::ReservedKey { path } => {
                write!(f, "key `{path}` uses the reserved timestamp tag")
            }
            Self::ColumnCollision { column } => {
                write!(f, "more than one field flattens to column `{column}`")
            }
            Self::Encode(message) => write!(f, "serialization failed: {message}"),
        }
    }
}

impl Error for SerializationError {}

impl From<serde_json::Error> for SerializationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value.to_string())
    }
}

/// A persisted document could not be turned back into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    InvalidTimestamp(String),
    NilIdentifier,
    Malformed(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimestamp(raw) => write!(f, "invalid timestamp `{raw}`"),
            Self::NilIdentifier => write!(f, "record identifier must not be nil"),
            Self::Malformed(message) => write!(f, "malformed record document: {message}"),
        }
    }
}

impl Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Rejected mutation through the generic field view.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Recognized key received a value of the wrong kind.
    WrongKind { key: String, expected: &'static str },
    /// Key cannot be written after construction.
    ReadOnly(&'static str),
    /// Recognized keys always exist and cannot be removed.
    NotRemovable(String),
    /// Value is not representable in the persistence format.
    Unrepresentable(SerializationError),
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongKind { key, expected } => write!(f, "field `{key}` expects {expected}"),
            Self::ReadOnly(key) => write!(f, "field `{key}` is read-only"),
            Self::NotRemovable(key) => write!(f, "field `{key}` cannot be removed"),
            Self::Unrepresentable(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unrepresentable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SerializationError> for FieldError {
    fn from(value: SerializationError) -> Self {
        Self::Unrepresentable(value)
    }
}
