//! Record domain model.
//!
//! # Responsibility
//! - Define one experiment note: identity, recognized fields, provenance and
//!   an open extension mapping.
//! - Provide lifecycle helpers (`close`, `derive_from`) and the persisted
//!   document shape.
//!
//! # Invariants
//! - `identifier` is generated at construction and never changes.
//! - Recognized keys live in typed slots; `extra` never holds a recognized key,
//!   so the named accessors and the generic field view share one storage.
//! - `close` keeps the first end time; later calls are no-ops.
//! - `start_time`/`end_time` persist as path-safe fixed-format strings.

use crate::model::error::{DecodeError, FieldError, SerializationError};
use crate::model::timestamp::{self, serde_optional_timestamp, serde_timestamp, Timestamp};
use crate::model::value::{validate_fields, FieldValue, Fields};
use crate::provenance::{self, GitProbe, SourceControl, SourceControlProbe};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Unique record identifier within a store.
pub type RecordId = Uuid;

pub const IDENTIFIER_KEY: &str = "identifier";
pub const TEXT_KEY: &str = "text";
pub const MODEL_KEY: &str = "model";
pub const PARAMETERS_KEY: &str = "parameters";
pub const FEATURES_KEY: &str = "features";
pub const TARGET_KEY: &str = "target";
pub const METRICS_KEY: &str = "metrics";
pub const INFO_KEY: &str = "info";
pub const START_TIME_KEY: &str = "start_time";
pub const END_TIME_KEY: &str = "end_time";
pub const ENVIRONMENT_PATH_KEY: &str = "environment_path";
pub const SOURCE_CONTROL_KEY: &str = "source_control";

/// Recognized keys in persisted order.
pub const RECOGNIZED_KEYS: [&str; 12] = [
    IDENTIFIER_KEY,
    TEXT_KEY,
    MODEL_KEY,
    PARAMETERS_KEY,
    FEATURES_KEY,
    TARGET_KEY,
    METRICS_KEY,
    INFO_KEY,
    START_TIME_KEY,
    END_TIME_KEY,
    ENVIRONMENT_PATH_KEY,
    SOURCE_CONTROL_KEY,
];

/// Default `features` layout: one empty list per feature category.
pub fn default_features() -> Fields {
    ["identifier", "binary", "categorical", "numerical"]
        .into_iter()
        .map(|category| (category.to_string(), FieldValue::List(Vec::new())))
        .collect()
}

pub fn is_recognized_key(key: &str) -> bool {
    RECOGNIZED_KEYS.contains(&key)
}

/// One experiment note.
///
/// Equality and hashing use the identifier only; use [`Record::same_content`]
/// to compare every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    identifier: RecordId,
    #[serde(default)]
    text: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    parameters: Fields,
    #[serde(default = "default_features")]
    features: Fields,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    metrics: Fields,
    #[serde(default)]
    info: Fields,
    #[serde(with = "serde_timestamp")]
    start_time: Timestamp,
    #[serde(default, with = "serde_optional_timestamp")]
    end_time: Option<Timestamp>,
    #[serde(default)]
    environment_path: Option<String>,
    #[serde(default)]
    source_control: SourceControl,
    #[serde(flatten)]
    extra: Fields,
}

impl Record {
    /// Creates a record and captures provenance from the current directory.
    ///
    /// Never fails: a missing repository or failing `git` leaves
    /// `source_control` empty.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_probe(text, &GitProbe::default())
    }

    /// Creates a record using the given source-control probe.
    pub fn with_probe<P: SourceControlProbe + ?Sized>(text: impl Into<String>, probe: &P) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            text: text.into(),
            model: None,
            parameters: Fields::new(),
            features: default_features(),
            target: None,
            metrics: Fields::new(),
            info: Fields::new(),
            start_time: timestamp::now(),
            end_time: None,
            environment_path: provenance::environment_path(),
            source_control: probe.probe(&provenance::working_dir()),
            extra: Fields::new(),
        }
    }

    /// Creates a new record carrying deep copies of `other`'s fields.
    ///
    /// The copy gets a fresh identifier, starts now and is open.
    pub fn derive_from(other: &Record) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            start_time: timestamp::now(),
            end_time: None,
            ..other.clone()
        }
    }

    /// Sets `end_time` to now unless already closed.
    pub fn close(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(timestamp::now());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn identifier(&self) -> RecordId {
        self.identifier
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.model = model;
    }

    pub fn parameters(&self) -> &Fields {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Fields {
        &mut self.parameters
    }

    pub fn features(&self) -> &Fields {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut Fields {
        &mut self.features
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
    }

    pub fn metrics(&self) -> &Fields {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut Fields {
        &mut self.metrics
    }

    pub fn info(&self) -> &Fields {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut Fields {
        &mut self.info
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    pub fn environment_path(&self) -> Option<&str> {
        self.environment_path.as_deref()
    }

    pub fn source_control(&self) -> &SourceControl {
        &self.source_control
    }

    /// Non-recognized keys, in insertion order.
    pub fn extra(&self) -> &Fields {
        &self.extra
    }

    /// All keys of the generic view: recognized keys first, then extras.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        let recognized: &[&str] = &RECOGNIZED_KEYS;
        recognized
            .iter()
            .copied()
            .chain(self.extra.keys().map(String::as_str))
    }

    /// Reads any key through the generic mapping view.
    pub fn field(&self, key: &str) -> Option<FieldValue> {
        let value = match key {
            IDENTIFIER_KEY => FieldValue::Text(self.identifier.to_string()),
            TEXT_KEY => FieldValue::Text(self.text.clone()),
            MODEL_KEY => self.model.clone().into(),
            PARAMETERS_KEY => FieldValue::Map(self.parameters.clone()),
            FEATURES_KEY => FieldValue::Map(self.features.clone()),
            TARGET_KEY => self.target.clone().into(),
            METRICS_KEY => FieldValue::Map(self.metrics.clone()),
            INFO_KEY => FieldValue::Map(self.info.clone()),
            START_TIME_KEY => FieldValue::Timestamp(self.start_time),
            END_TIME_KEY => self.end_time.into(),
            ENVIRONMENT_PATH_KEY => self.environment_path.clone().into(),
            SOURCE_CONTROL_KEY => FieldValue::Map(self.source_control.to_fields()),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }

    /// Writes any key through the generic mapping view.
    ///
    /// The value is checked for serializability before it is stored, and
    /// recognized keys only accept their own value kind.
    pub fn set_field(&mut self, key: &str, value: impl Into<FieldValue>) -> Result<(), FieldError> {
        let value = value.into();
        value.validate_at(key)?;

        match key {
            IDENTIFIER_KEY => return Err(FieldError::ReadOnly(IDENTIFIER_KEY)),
            TEXT_KEY => self.text = expect_text(key, value)?,
            MODEL_KEY => self.model = expect_optional_text(key, value)?,
            PARAMETERS_KEY => self.parameters = expect_map(key, value)?,
            FEATURES_KEY => self.features = expect_map(key, value)?,
            TARGET_KEY => self.target = expect_optional_text(key, value)?,
            METRICS_KEY => self.metrics = expect_map(key, value)?,
            INFO_KEY => self.info = expect_map(key, value)?,
            START_TIME_KEY => match value {
                FieldValue::Timestamp(value) => self.start_time = value,
                _ => return Err(wrong_kind(key, "a timestamp")),
            },
            END_TIME_KEY => match value {
                FieldValue::Timestamp(value) => self.end_time = Some(value),
                FieldValue::Null => self.end_time = None,
                _ => return Err(wrong_kind(key, "a timestamp or null")),
            },
            ENVIRONMENT_PATH_KEY => self.environment_path = expect_optional_text(key, value)?,
            SOURCE_CONTROL_KEY => {
                let fields = expect_map(key, value)?;
                self.source_control = SourceControl::from_fields(&fields).map_err(|_| {
                    wrong_kind(key, "a map of repo_name/branch/commit text values")
                })?;
            }
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
        Ok(())
    }

    /// Removes a non-recognized key, returning its previous value.
    pub fn remove_field(&mut self, key: &str) -> Result<Option<FieldValue>, FieldError> {
        if is_recognized_key(key) {
            return Err(FieldError::NotRemovable(key.to_string()));
        }
        Ok(self.extra.shift_remove(key))
    }

    /// Compares every field, including identifier and timestamps.
    pub fn same_content(&self, other: &Record) -> bool {
        self.identifier == other.identifier
            && self.text == other.text
            && self.model == other.model
            && self.parameters == other.parameters
            && self.features == other.features
            && self.target == other.target
            && self.metrics == other.metrics
            && self.info == other.info
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.environment_path == other.environment_path
            && self.source_control == other.source_control
            && self.extra == other.extra
    }

    /// Checks that every value can be written to the persistence format.
    pub fn validate(&self) -> Result<(), SerializationError> {
        validate_fields(&self.parameters, PARAMETERS_KEY)?;
        validate_fields(&self.features, FEATURES_KEY)?;
        validate_fields(&self.metrics, METRICS_KEY)?;
        validate_fields(&self.info, INFO_KEY)?;
        validate_fields(&self.extra, "")
    }

    /// Encodes this record as one ordered JSON object, identifier first.
    pub fn to_document(&self) -> Result<Value, SerializationError> {
        self.validate()?;
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a record from a persisted document.
    pub fn from_document(document: Value) -> Result<Self, DecodeError> {
        let record: Record = serde_json::from_value(document)?;
        if record.identifier.is_nil() {
            return Err(DecodeError::NilIdentifier);
        }
        Ok(record)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

fn wrong_kind(key: &str, expected: &'static str) -> FieldError {
    FieldError::WrongKind {
        key: key.to_string(),
        expected,
    }
}

fn expect_text(key: &str, value: FieldValue) -> Result<String, FieldError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        _ => Err(wrong_kind(key, "text")),
    }
}

fn expect_optional_text(key: &str, value: FieldValue) -> Result<Option<String>, FieldError> {
    match value {
        FieldValue::Text(text) => Ok(Some(text)),
        FieldValue::Null => Ok(None),
        _ => Err(wrong_kind(key, "text or null")),
    }
}

fn expect_map(key: &str, value: FieldValue) -> Result<Fields, FieldError> {
    match value {
        FieldValue::Map(fields) => Ok(fields),
        _ => Err(wrong_kind(key, "a map")),
    }
}
