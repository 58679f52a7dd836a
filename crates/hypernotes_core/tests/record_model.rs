use chrono::NaiveDate;
use hypernotes_core::model::record::{
    END_TIME_KEY, IDENTIFIER_KEY, METRICS_KEY, MODEL_KEY, PARAMETERS_KEY, SOURCE_CONTROL_KEY,
    START_TIME_KEY, TEXT_KEY,
};
use hypernotes_core::{
    default_features, FieldError, FieldValue, Fields, FixedProbe, NoProbe, Record,
    SerializationError, SourceControl,
};
use serde_json::json;

fn map(entries: &[(&str, FieldValue)]) -> Fields {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn record_new_sets_defaults() {
    let record = Record::with_probe("baseline", &NoProbe);

    assert!(!record.identifier().is_nil());
    assert_eq!(record.text(), "baseline");
    assert_eq!(record.model(), None);
    assert_eq!(record.target(), None);
    assert!(record.parameters().is_empty());
    assert!(record.metrics().is_empty());
    assert!(record.info().is_empty());
    assert_eq!(record.features(), &default_features());
    assert_eq!(record.end_time(), None);
    assert!(!record.is_closed());
    assert!(record.source_control().is_empty());
    assert!(record.extra().is_empty());
}

#[test]
fn records_get_distinct_identifiers() {
    let first = Record::with_probe("a", &NoProbe);
    let second = Record::with_probe("a", &NoProbe);
    assert_ne!(first.identifier(), second.identifier());
    assert_ne!(first, second);
}

#[test]
fn probe_result_is_captured_as_source_control() {
    let probe = FixedProbe(SourceControl {
        repo_name: Some("churn-model".to_string()),
        branch: Some("main".to_string()),
        commit: Some("1a2b3c4".to_string()),
    });
    let record = Record::with_probe("with git", &probe);

    assert_eq!(record.source_control(), &probe.0);
    let document = record.to_document().unwrap();
    assert_eq!(
        document[SOURCE_CONTROL_KEY],
        json!({"repo_name": "churn-model", "branch": "main", "commit": "1a2b3c4"})
    );
}

#[test]
fn record_new_never_fails_outside_a_repository() {
    let record = Record::new("probe the current directory");
    let document = record.to_document().unwrap();
    assert!(document[SOURCE_CONTROL_KEY].is_object());
}

#[test]
fn close_is_idempotent_and_keeps_first_end_time() {
    let mut record = Record::with_probe("close me", &NoProbe);
    record.close();
    let first_end = record.end_time().unwrap();
    assert!(first_end >= record.start_time());

    std::thread::sleep(std::time::Duration::from_millis(2));
    record.close();
    assert_eq!(record.end_time(), Some(first_end));
}

#[test]
fn derive_from_copies_fields_but_not_identity_or_timing() {
    let mut original = Record::with_probe("original", &NoProbe);
    original.set_model(Some("rf".to_string()));
    original
        .parameters_mut()
        .insert("n_estimators".to_string(), 100.into());
    original.set_field("owner", "team-a").unwrap();
    original.close();

    let mut derived = Record::derive_from(&original);

    assert_ne!(derived.identifier(), original.identifier());
    assert_eq!(derived.end_time(), None);
    assert!(derived.start_time() >= original.start_time());
    assert_eq!(derived.model(), Some("rf"));
    assert_eq!(derived.parameters(), original.parameters());
    assert_eq!(derived.field("owner"), Some("team-a".into()));

    derived
        .parameters_mut()
        .insert("max_depth".to_string(), 4.into());
    derived
        .parameters_mut()
        .insert("n_estimators".to_string(), 5.into());
    assert_eq!(original.parameters().len(), 1);
    assert_eq!(
        original.parameters().get("n_estimators"),
        Some(&FieldValue::Int(100))
    );
}

#[test]
fn named_accessors_and_field_view_share_storage() {
    let mut record = Record::with_probe("views", &NoProbe);

    record
        .metrics_mut()
        .insert("recall".to_string(), 0.5.into());
    assert_eq!(
        record.field(METRICS_KEY),
        Some(FieldValue::Map(map(&[("recall", FieldValue::Float(0.5))])))
    );

    record.set_field(MODEL_KEY, "xgboost").unwrap();
    assert_eq!(record.model(), Some("xgboost"));

    record
        .set_field(PARAMETERS_KEY, map(&[("lr", FieldValue::Float(0.1))]))
        .unwrap();
    assert_eq!(record.parameters().get("lr"), Some(&FieldValue::Float(0.1)));

    record.set_field(TEXT_KEY, "renamed").unwrap();
    assert_eq!(record.text(), "renamed");

    assert_eq!(
        record.field(IDENTIFIER_KEY),
        Some(FieldValue::Text(record.identifier().to_string()))
    );
}

#[test]
fn extension_keys_are_listed_after_recognized_keys() {
    let mut record = Record::with_probe("extras", &NoProbe);
    record.set_field("dataset", "train_v2").unwrap();
    record.set_field("seed", 42).unwrap();

    let keys: Vec<&str> = record.keys().collect();
    assert_eq!(keys.first().copied(), Some(IDENTIFIER_KEY));
    assert_eq!(&keys[keys.len() - 2..], ["dataset", "seed"]);

    assert_eq!(record.remove_field("seed").unwrap(), Some(FieldValue::Int(42)));
    assert_eq!(record.field("seed"), None);
}

#[test]
fn set_field_rejects_wrong_kind_read_only_and_unrepresentable_values() {
    let mut record = Record::with_probe("guarded", &NoProbe);

    assert!(matches!(
        record.set_field(PARAMETERS_KEY, "not a map"),
        Err(FieldError::WrongKind { ref key, .. }) if key == PARAMETERS_KEY
    ));
    assert_eq!(
        record.set_field(IDENTIFIER_KEY, "other"),
        Err(FieldError::ReadOnly(IDENTIFIER_KEY))
    );
    assert!(matches!(
        record.set_field("loss", f64::NAN),
        Err(FieldError::Unrepresentable(SerializationError::NonFiniteFloat { ref path, .. }))
            if path == "loss"
    ));
    assert_eq!(record.field("loss"), None);
    assert!(matches!(
        record.remove_field(METRICS_KEY),
        Err(FieldError::NotRemovable(_))
    ));
}

#[test]
fn set_field_rejects_maps_using_the_timestamp_tag() {
    let mut record = Record::with_probe("tagged", &NoProbe);
    let tagged = map(&[("$timestamp", "2020-01-01T00-00-00".into())]);

    assert!(matches!(
        record.set_field("k", tagged),
        Err(FieldError::Unrepresentable(SerializationError::ReservedKey { ref path }))
            if path == "k.$timestamp"
    ));
    assert_eq!(record.field("k"), None);
}

#[test]
fn set_field_accepts_timestamps_for_timing_keys() {
    let mut record = Record::with_probe("timing", &NoProbe);
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();

    record.set_field(START_TIME_KEY, start).unwrap();
    record.set_field(END_TIME_KEY, start).unwrap();
    assert_eq!(record.start_time(), start);
    assert_eq!(record.end_time(), Some(start));

    record.set_field(END_TIME_KEY, FieldValue::Null).unwrap();
    assert_eq!(record.end_time(), None);
    assert!(record.set_field(START_TIME_KEY, FieldValue::Null).is_err());
}

#[test]
fn document_round_trip_preserves_every_field() {
    let mut record = Record::with_probe("round trip", &NoProbe);
    record.set_model(Some("rf".to_string()));
    record.set_target(Some("churned".to_string()));
    record.parameters_mut().insert("n".to_string(), 10.into());
    record.parameters_mut().insert(
        "grid".to_string(),
        FieldValue::List(vec![1.into(), 2.5.into(), "auto".into(), FieldValue::Null]),
    );
    record.metrics_mut().insert(
        "test".to_string(),
        FieldValue::Map(map(&[("recall", 0.5.into()), ("support", 120.into())])),
    );
    let started = record.start_time();
    record
        .info_mut()
        .insert("checkpoint".to_string(), FieldValue::Timestamp(started));
    record.set_field("notes", vec!["first", "second"]).unwrap();
    record.close();

    let document = record.to_document().unwrap();
    let decoded = Record::from_document(document).unwrap();

    assert!(decoded.same_content(&record));
}

#[test]
fn document_uses_path_safe_timestamp_strings() {
    let mut record = Record::with_probe("wire", &NoProbe);
    record.close();
    let document = record.to_document().unwrap();

    let start = document[START_TIME_KEY].as_str().unwrap();
    let end = document[END_TIME_KEY].as_str().unwrap();
    for value in [start, end] {
        assert!(!value.contains(':'), "unexpected separator in {value}");
        assert_eq!(value.len(), "2026-10-19T14-03-07.123456".len());
    }
}

#[test]
fn open_record_serializes_null_end_time() {
    let record = Record::with_probe("open", &NoProbe);
    let document = record.to_document().unwrap();
    assert!(document[END_TIME_KEY].is_null());
}

#[test]
fn to_document_rejects_non_finite_metric() {
    let mut record = Record::with_probe("bad metric", &NoProbe);
    record
        .metrics_mut()
        .insert("loss".to_string(), f64::INFINITY.into());

    let err = record.to_document().unwrap_err();
    assert_eq!(
        err,
        SerializationError::NonFiniteFloat {
            path: "metrics.loss".to_string(),
            value: f64::INFINITY,
        }
    );
}

#[test]
fn from_document_fills_missing_optional_keys() {
    let decoded = Record::from_document(json!({
        "identifier": "11111111-2222-4333-8444-555555555555",
        "start_time": "2019-06-01T08-30-00",
        "model": "logreg",
        "custom": {"a": 1}
    }))
    .unwrap();

    assert_eq!(decoded.model(), Some("logreg"));
    assert_eq!(decoded.text(), "");
    assert_eq!(decoded.features(), &default_features());
    assert!(decoded.source_control().is_empty());
    assert_eq!(
        decoded.field("custom"),
        Some(FieldValue::Map(map(&[("a", 1.into())])))
    );
}

#[test]
fn from_document_rejects_nil_identifier_and_bad_timestamps() {
    let nil = Record::from_document(json!({
        "identifier": "00000000-0000-0000-0000-000000000000",
        "start_time": "2019-06-01T08-30-00"
    }));
    assert!(nil.is_err());

    let bad_time = Record::from_document(json!({
        "identifier": "11111111-2222-4333-8444-555555555555",
        "start_time": "last tuesday"
    }));
    assert!(bad_time.is_err());
}
