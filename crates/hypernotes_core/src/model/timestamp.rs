//! Timestamp representation shared by records and field values.
//!
//! # Invariants
//! - Timestamps are local wall-clock times truncated to microseconds, so a
//!   formatted timestamp parses back to the identical value.
//! - The persisted form contains no `:` and is safe as a path segment.

use crate::model::error::DecodeError;
use chrono::{Local, NaiveDateTime, SubsecRound};

/// Local naive date-time with microsecond precision.
pub type Timestamp = NaiveDateTime;

/// Persisted timestamp layout, e.g. `2026-10-19T14-03-07.123456`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6f";

const PARSE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H-%M-%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Returns the current local time at persisted precision.
pub fn now() -> Timestamp {
    Local::now().naive_local().trunc_subsecs(6)
}

pub fn format_timestamp(value: &Timestamp) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a persisted timestamp.
///
/// Accepts the path-safe layout (with or without fractional seconds) and,
/// for files written by older tools, plain ISO-8601 with `:` separators.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, DecodeError> {
    let trimmed = raw.trim();
    PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|parsed| parsed.trunc_subsecs(6))
        .ok_or_else(|| DecodeError::InvalidTimestamp(raw.to_string()))
}

/// Serde adapter for required timestamp fields.
pub(crate) mod serde_timestamp {
    use super::{format_timestamp, parse_timestamp, Timestamp};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for nullable timestamp fields.
pub(crate) mod serde_optional_timestamp {
    use super::{format_timestamp, parse_timestamp, Timestamp};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&format_timestamp(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_timestamp(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
