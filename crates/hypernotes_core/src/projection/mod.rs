//! Tabular projection of record collections.
//!
//! # Responsibility
//! - Flatten nested record documents into single-level rows keyed by
//!   dotted-path column names (`metrics.test.recall`).
//! - Fix a stable column order for viewers.
//!
//! # Invariants
//! - `identifier` is always the first column.
//! - Column names are unique.

mod table;

pub use table::{flatten_document, Table};
