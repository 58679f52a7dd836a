//! JSON-file record store.
//!
//! # Responsibility
//! - Persist a record collection as one JSON array in a single file.
//! - Enforce identifier uniqueness and all-or-nothing batch semantics.
//!
//! # Invariants
//! - The file is the only state: every call re-reads it, nothing is cached.
//! - A missing or blank file is an empty collection; a corrupt file is an
//!   error and is never overwritten implicitly.
//! - Writes serialize the full new collection first and only then replace
//!   the file atomically.
//! - No cross-process locking: concurrent writers race, last one wins.

use super::atomic::atomic_write;
use super::{LoadOptions, RecordKey, RecordStore, StoreError, StoreResult};
use crate::model::error::SerializationError;
use crate::model::record::{Record, RecordId};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Write options for [`JsonFileStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Indent the JSON document.
    pub pretty: bool,
    /// Store still-open records closed (end time set at add time).
    pub close_on_add: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            close_on_add: false,
        }
    }
}

/// Record store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    options: StoreOptions,
}

impl JsonFileStore {
    /// Creates a store over `path` with default options.
    ///
    /// The file is not touched until the first successful mutation.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, StoreOptions::default())
    }

    pub fn with_options(path: impl AsRef<Path>, options: StoreOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    fn read_all(&self) -> StoreResult<Vec<Record>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let documents: Vec<Value> = serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::InvalidData(format!("expected a JSON array of records: {err}"))
        })?;

        let mut seen = HashSet::with_capacity(documents.len());
        let mut records = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            let record = Record::from_document(document)
                .map_err(|err| StoreError::InvalidData(format!("entry {index}: {err}")))?;
            if !seen.insert(record.identifier()) {
                return Err(StoreError::InvalidData(format!(
                    "entry {index}: duplicate identifier {}",
                    record.identifier()
                )));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn commit(&self, op: &str, records: &[Record], started_at: Instant) -> StoreResult<()> {
        let bytes = match encode_collection(records, self.options.pretty) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    "event=store_write module=store status=rejected op={op} error_code=serialization_failed error={err}"
                );
                return Err(err.into());
            }
        };

        match atomic_write(&self.path, &bytes) {
            Ok(()) => {
                info!(
                    "event=store_write module=store status=ok op={op} count={} bytes={} duration_ms={}",
                    records.len(),
                    bytes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=store_write module=store status=error op={op} duration_ms={} error_code=write_failed error={source}",
                    started_at.elapsed().as_millis()
                );
                Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn prepare_for_storing(&self, record: &Record) -> Record {
        let mut stored = record.clone();
        if self.options.close_on_add {
            stored.close();
        }
        stored
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self, options: &LoadOptions) -> StoreResult<Vec<Record>> {
        let started_at = Instant::now();
        let mut records = self.read_all()?;
        if options.sort_by_recency {
            sort_by_recency(&mut records);
        }
        debug!(
            "event=store_load module=store status=ok count={} sorted={} duration_ms={}",
            records.len(),
            options.sort_by_recency,
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    fn add_many(&self, records: &[Record]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let mut stored = self.read_all()?;

        let mut seen: HashSet<RecordId> = stored.iter().map(Record::identifier).collect();
        for record in records {
            if !seen.insert(record.identifier()) {
                warn!(
                    "event=store_add module=store status=rejected error_code=duplicate_identifier id={}",
                    record.identifier()
                );
                return Err(StoreError::DuplicateIdentifier(record.identifier()));
            }
        }

        stored.extend(records.iter().map(|record| self.prepare_for_storing(record)));
        self.commit("add", &stored, started_at)
    }

    fn update(&self, records: &[Record]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let mut stored = self.read_all()?;

        let positions: HashMap<RecordId, usize> = stored
            .iter()
            .enumerate()
            .map(|(index, record)| (record.identifier(), index))
            .collect();
        let mut touched = HashSet::with_capacity(records.len());
        let mut replacements = Vec::with_capacity(records.len());
        for record in records {
            let id = record.identifier();
            let Some(&index) = positions.get(&id) else {
                warn!(
                    "event=store_update module=store status=rejected error_code=not_found id={id}"
                );
                return Err(StoreError::NotFound(id));
            };
            if !touched.insert(id) {
                return Err(StoreError::DuplicateIdentifier(id));
            }
            replacements.push((index, record));
        }

        for (index, record) in replacements {
            stored[index] = record.clone();
        }
        self.commit("update", &stored, started_at)
    }

    fn remove<K: RecordKey>(&self, targets: &[K]) -> StoreResult<()> {
        if targets.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let mut stored = self.read_all()?;

        let present: HashSet<RecordId> = stored.iter().map(Record::identifier).collect();
        let mut doomed = HashSet::with_capacity(targets.len());
        for target in targets {
            let id = target.record_id();
            if !present.contains(&id) {
                warn!(
                    "event=store_remove module=store status=rejected error_code=not_found id={id}"
                );
                return Err(StoreError::NotFound(id));
            }
            doomed.insert(id);
        }

        stored.retain(|record| !doomed.contains(&record.identifier()));
        self.commit("remove", &stored, started_at)
    }
}

/// Most recent `start_time` first; ties keep file order.
fn sort_by_recency(records: &mut [Record]) {
    records.sort_by(|left, right| right.start_time().cmp(&left.start_time()));
}

fn encode_collection(records: &[Record], pretty: bool) -> Result<Vec<u8>, SerializationError> {
    let documents = records
        .iter()
        .map(Record::to_document)
        .collect::<Result<Vec<_>, _>>()?;
    let collection = Value::Array(documents);
    let bytes = if pretty {
        serde_json::to_vec_pretty(&collection)?
    } else {
        serde_json::to_vec(&collection)?
    };
    Ok(bytes)
}
