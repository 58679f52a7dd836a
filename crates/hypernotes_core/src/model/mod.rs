//! Domain model for experiment notes.
//!
//! # Responsibility
//! - Define the record shape persisted by stores.
//! - Keep every field value representable in the JSON persistence format.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Values that cannot be encoded are rejected before any write happens.

pub mod error;
pub mod record;
pub mod timestamp;
pub mod value;
