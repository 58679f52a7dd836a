//! Core library for hypernotes: notes on machine-learning experiments,
//! persisted as one JSON file per store.

pub mod logging;
pub mod model;
pub mod projection;
pub mod provenance;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::error::{DecodeError, FieldError, SerializationError};
pub use model::record::{default_features, Record, RecordId};
pub use model::timestamp::{format_timestamp, parse_timestamp, Timestamp, TIMESTAMP_FORMAT};
pub use model::value::{FieldValue, Fields};
pub use projection::Table;
pub use provenance::{FixedProbe, GitProbe, NoProbe, SourceControl, SourceControlProbe};
pub use store::{
    JsonFileStore, LoadOptions, RecordKey, RecordStore, StoreError, StoreOptions, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
