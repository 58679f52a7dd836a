//! Record stores.
//!
//! # Responsibility
//! - Define the load/add/update/remove contract over a collection of records.
//! - Provide the JSON-file implementation and its atomic replace protocol.
//!
//! # Invariants
//! - Identifiers are unique within one persisted collection.
//! - Batch mutations are all-or-nothing: one rewrite on success, no write on
//!   any failure.
//! - A failed serialization never touches the backing file.

mod atomic;
mod json_file;

pub use atomic::atomic_write;
pub use json_file::{JsonFileStore, StoreOptions};

use crate::model::error::SerializationError;
use crate::model::record::{Record, RecordId};
use crate::projection::Table;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
#[derive(Debug)]
pub enum StoreError {
    /// The new collection could not be encoded; nothing was written.
    Serialization(SerializationError),
    /// Identifier already persisted, or repeated within the batch.
    DuplicateIdentifier(RecordId),
    /// Identifier absent from the persisted collection.
    NotFound(RecordId),
    /// Reading or replacing the backing file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Backing file exists but does not hold a valid collection.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(err) => write!(f, "{err}"),
            Self::DuplicateIdentifier(id) => {
                write!(f, "record identifier already exists in the store: {id}")
            }
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Io { path, source } => write!(f, "store file `{}`: {source}", path.display()),
            Self::InvalidData(message) => write!(f, "invalid store data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::DuplicateIdentifier(_) | Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<SerializationError> for StoreError {
    fn from(value: SerializationError) -> Self {
        Self::Serialization(value)
    }
}

/// Options for reading a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Order by `start_time`, most recent first. Otherwise keep file order.
    pub sort_by_recency: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sort_by_recency: true,
        }
    }
}

impl LoadOptions {
    pub fn file_order() -> Self {
        Self {
            sort_by_recency: false,
        }
    }
}

/// Anything that names a record: the record itself or its identifier.
pub trait RecordKey {
    fn record_id(&self) -> RecordId;
}

impl RecordKey for RecordId {
    fn record_id(&self) -> RecordId {
        *self
    }
}

impl RecordKey for Record {
    fn record_id(&self) -> RecordId {
        self.identifier()
    }
}

impl<T: RecordKey + ?Sized> RecordKey for &T {
    fn record_id(&self) -> RecordId {
        (**self).record_id()
    }
}

/// Store interface for record collections.
///
/// Every call re-reads the persisted collection; returned records are
/// independent copies owned by the caller.
pub trait RecordStore {
    /// Returns every persisted record.
    fn load(&self, options: &LoadOptions) -> StoreResult<Vec<Record>>;

    /// Adds records, rejecting identifiers already persisted or repeated
    /// within `records`.
    fn add_many(&self, records: &[Record]) -> StoreResult<()>;

    /// Replaces persisted records that share an identifier with `records`.
    fn update(&self, records: &[Record]) -> StoreResult<()>;

    /// Removes the persisted records named by `targets`.
    fn remove<K: RecordKey>(&self, targets: &[K]) -> StoreResult<()>;

    /// Adds a single record.
    fn add(&self, record: &Record) -> StoreResult<()> {
        self.add_many(std::slice::from_ref(record))
    }

    /// Loads the collection flattened into dotted-path columns.
    fn load_table(&self, options: &LoadOptions) -> StoreResult<Table> {
        let records = self.load(options)?;
        Ok(Table::from_records(&records)?)
    }
}
