use crate::model::error::SerializationError;
use crate::model::record::{
    Record, END_TIME_KEY, FEATURES_KEY, IDENTIFIER_KEY, METRICS_KEY, MODEL_KEY, PARAMETERS_KEY,
    SOURCE_CONTROL_KEY, START_TIME_KEY, TARGET_KEY, TEXT_KEY,
};
use crate::model::value::tagged_timestamp;
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

const COLUMN_SEPARATOR: &str = "  ";

/// Column slots in display order. A `Prefix` slot takes every column nested
/// under that key, in first-seen order.
enum Slot {
    Exact(&'static str),
    Prefix(&'static str),
}

const COLUMN_LAYOUT: [Slot; 10] = [
    Slot::Exact(IDENTIFIER_KEY),
    Slot::Exact(START_TIME_KEY),
    Slot::Exact(END_TIME_KEY),
    Slot::Exact(TEXT_KEY),
    Slot::Exact(MODEL_KEY),
    Slot::Prefix(METRICS_KEY),
    Slot::Prefix(PARAMETERS_KEY),
    Slot::Prefix(FEATURES_KEY),
    Slot::Exact(TARGET_KEY),
    Slot::Prefix(SOURCE_CONTROL_KEY),
];

/// Flattened records: one row per record, one column per dotted path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Projects records in the given order. Cells a record lacks are `null`.
    pub fn from_records(records: &[Record]) -> Result<Self, SerializationError> {
        let flat_rows = records
            .iter()
            .map(|record| flatten_document(&record.to_document()?))
            .collect::<Result<Vec<_>, _>>()?;

        let columns = order_columns(&flat_rows);
        let rows = flat_rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|cells| &cells[index])
    }

    /// Rows as JSON objects keyed by column name, in column order.
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// Renders an aligned plain-text table with a header line.
    pub fn render_text(&self) -> String {
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(display_cell).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                body.iter()
                    .map(|cells| cells[index].chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        push_line(&mut out, self.columns.iter().map(String::as_str), &widths);
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        push_line(&mut out, rule.iter().map(String::as_str), &widths);
        for cells in &body {
            push_line(&mut out, cells.iter().map(String::as_str), &widths);
        }
        out
    }
}

/// Flattens one record document into dotted-path columns.
///
/// Empty mappings contribute no columns; lists stay whole; tagged nested
/// timestamps collapse to their string form.
///
/// # Errors
/// Fails with [`SerializationError::ColumnCollision`] when a key containing
/// dots spells the same column as a nested path (`"metrics.auc"` next to
/// `metrics.auc`).
pub fn flatten_document(document: &Value) -> Result<IndexMap<String, Value>, SerializationError> {
    let mut out = IndexMap::new();
    flatten_into("", document, &mut out)?;
    Ok(out)
}

fn flatten_into(
    prefix: &str,
    value: &Value,
    out: &mut IndexMap<String, Value>,
) -> Result<(), SerializationError> {
    match value {
        Value::Object(map) => {
            if let Some(raw) = tagged_timestamp(map) {
                return insert_cell(out, prefix, Value::String(raw.to_string()));
            }
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, nested, out)?;
            }
            Ok(())
        }
        leaf => insert_cell(out, prefix, leaf.clone()),
    }
}

fn insert_cell(
    out: &mut IndexMap<String, Value>,
    column: &str,
    value: Value,
) -> Result<(), SerializationError> {
    match out.entry(column.to_string()) {
        Entry::Occupied(_) => Err(SerializationError::ColumnCollision {
            column: column.to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

fn order_columns(rows: &[IndexMap<String, Value>]) -> Vec<String> {
    let seen: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut ordered: IndexSet<&str> = IndexSet::with_capacity(seen.len());
    for slot in &COLUMN_LAYOUT {
        match slot {
            Slot::Exact(name) => {
                if seen.contains(*name) {
                    ordered.insert(*name);
                }
            }
            Slot::Prefix(group) => {
                let group: &str = group;
                let nested = format!("{group}.");
                ordered.extend(
                    seen.iter()
                        .copied()
                        .filter(|column| *column == group || column.starts_with(&nested)),
                );
            }
        }
    }
    ordered.extend(seen.iter().copied());
    ordered.into_iter().map(str::to_string).collect()
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR);
    out.push_str(line.trim_end());
    out.push('\n');
}
