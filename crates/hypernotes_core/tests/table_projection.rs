use hypernotes_core::{
    FieldValue, Fields, JsonFileStore, LoadOptions, NoProbe, Record, RecordStore,
    SerializationError, StoreError, Table,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn note(text: &str) -> Record {
    Record::with_probe(text, &NoProbe)
}

fn nested(entries: &[(&str, FieldValue)]) -> FieldValue {
    FieldValue::Map(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<Fields>(),
    )
}

#[test]
fn nested_metrics_become_dotted_columns() {
    let mut record = note("recall check");
    record
        .metrics_mut()
        .insert("test".to_string(), nested(&[("recall", 0.5.into())]));

    let table = Table::from_records(&[record.clone()]).unwrap();

    assert_eq!(table.columns()[0], "identifier");
    assert_eq!(table.cell(0, "metrics.test.recall"), Some(&json!(0.5)));
    assert_eq!(
        table.cell(0, "identifier"),
        Some(&Value::String(record.identifier().to_string()))
    );
    assert!(table.column_index("metrics").is_none());
}

#[test]
fn columns_follow_the_fixed_layout_then_first_seen_order() {
    let mut first = note("first");
    first.set_model(Some("rf".to_string()));
    first.set_target(Some("churned".to_string()));
    first.parameters_mut().insert("n".to_string(), 10.into());
    first.metrics_mut().insert("auc".to_string(), 0.8.into());
    first.set_field("dataset", "v1").unwrap();
    first.close();

    let mut second = note("second");
    second.metrics_mut().insert("f1".to_string(), 0.7.into());
    second.set_field("seed", 7).unwrap();

    let table = Table::from_records(&[first, second]).unwrap();
    let columns: Vec<&str> = table.columns().iter().map(String::as_str).collect();

    let position = |name: &str| {
        columns
            .iter()
            .position(|column| *column == name)
            .unwrap_or_else(|| panic!("missing column {name}"))
    };
    assert_eq!(position("identifier"), 0);
    assert!(position("start_time") < position("end_time"));
    assert!(position("end_time") < position("text"));
    assert!(position("text") < position("model"));
    assert!(position("model") < position("metrics.auc"));
    assert!(position("metrics.auc") < position("metrics.f1"));
    assert!(position("metrics.f1") < position("parameters.n"));
    assert!(position("parameters.n") < position("features.categorical"));
    assert!(position("features.numerical") < position("target"));
    assert!(position("target") < position("dataset"));
    assert!(position("dataset") < position("seed"));

    let mut unique = columns.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), columns.len());
}

#[test]
fn missing_cells_are_null() {
    let mut with_metric = note("has metric");
    with_metric
        .metrics_mut()
        .insert("loss".to_string(), 0.25.into());
    let without_metric = note("no metric");

    let table = Table::from_records(&[with_metric, without_metric]).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(
        table.column("metrics.loss").unwrap(),
        vec![&json!(0.25), &Value::Null]
    );
    assert_eq!(table.cell(1, "end_time"), Some(&Value::Null));
}

#[test]
fn json_rows_are_keyed_by_column_name() {
    let mut record = note("json rows");
    record.parameters_mut().insert("depth".to_string(), 4.into());

    let table = Table::from_records(&[record]).unwrap();
    let rows = table.to_json_rows();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["text"], json!("json rows"));
    assert_eq!(rows[0]["parameters.depth"], json!(4));
    assert_eq!(
        rows[0].keys().collect::<Vec<_>>(),
        table.columns().iter().collect::<Vec<_>>()
    );
}

#[test]
fn render_text_prints_header_and_one_line_per_row() {
    let mut record = note("render me");
    record.set_model(Some("svm".to_string()));

    let table = Table::from_records(&[record]).unwrap();
    let rendered = table.render_text();
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("identifier"));
    assert!(lines[1].starts_with("---"));
    assert!(lines[2].contains("render me"));
    assert!(lines[2].contains("svm"));
}

#[test]
fn empty_collection_projects_to_empty_table() {
    let table = Table::from_records(&[]).unwrap();
    assert!(table.is_empty());
    assert!(table.columns().is_empty());
    assert!(table.to_json_rows().is_empty());
}

#[test]
fn projection_rejects_non_finite_values() {
    let mut record = note("bad");
    record.metrics_mut().insert("loss".to_string(), f64::NAN.into());
    assert!(Table::from_records(&[record]).is_err());
}

#[test]
fn store_load_table_projects_persisted_records() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileStore::new(tmp.path().join("notes.json"));
    let mut record = note("persisted");
    record
        .metrics_mut()
        .insert("test".to_string(), nested(&[("recall", 0.5.into())]));
    let started = record.start_time();
    record
        .info_mut()
        .insert("checkpoint".to_string(), FieldValue::Timestamp(started));
    store.add(&record).unwrap();

    let table = store.load_table(&LoadOptions::default()).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.cell(0, "metrics.test.recall"), Some(&json!(0.5)));
    assert_eq!(
        table.cell(0, "info.checkpoint"),
        table.cell(0, "start_time")
    );
}

#[test]
fn dotted_extension_key_cannot_shadow_a_nested_metric() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileStore::new(tmp.path().join("notes.json"));
    let mut record = note("shadowed");
    record
        .metrics_mut()
        .insert("test".to_string(), nested(&[("recall", 0.5.into())]));
    record.set_field("metrics.test.recall", 0.9).unwrap();

    let collision = SerializationError::ColumnCollision {
        column: "metrics.test.recall".to_string(),
    };
    assert_eq!(
        Table::from_records(&[record.clone()]).unwrap_err(),
        collision
    );

    store.add(&record).unwrap();
    assert!(matches!(
        store.load_table(&LoadOptions::default()),
        Err(StoreError::Serialization(err)) if err == collision
    ));
    assert_eq!(store.load(&LoadOptions::default()).unwrap().len(), 1);
}
