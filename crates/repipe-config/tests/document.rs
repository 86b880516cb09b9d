use repipe_config::{
    ConfigError, InstanceDescriptor, from_document_str, read_document, to_document_string,
    write_document,
};
use serde_json::json;

fn descriptor() -> serde_json::Value {
    InstanceDescriptor::new(
        "repipe.pipeline.FeatureSelector",
        json!({"features": ["text_seq", "category"]}),
    )
    .into_value()
}

#[test]
fn document_text_is_stable() {
    let text = to_document_string(&descriptor()).unwrap();
    insta::assert_snapshot!(text, @r#"
    {
      "instance": {
        "cls": "repipe.pipeline.FeatureSelector",
        "params": {
          "features": [
            "text_seq",
            "category"
          ]
        }
      }
    }
    "#);
}

#[test]
fn write_then_read_preserves_value_and_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("pipeline.json");
    let value = json!({"zeta": 0.1, "alpha": [1, 2.5e-8, null], "mid": {"b": true, "a": "x"}});

    write_document(&path, &value).unwrap();
    let back = read_document(&path).unwrap();

    assert_eq!(back, value);
    assert_eq!(
        to_document_string(&back).unwrap(),
        to_document_string(&value).unwrap()
    );
}

#[test]
fn floats_survive_text_round_trip() {
    let value = json!({"f1": 0.1 + 0.2, "tiny": 5e-324, "big": 1.7976931348623157e308});
    let text = to_document_string(&value).unwrap();
    assert_eq!(from_document_str(&text).unwrap(), value);
}

#[test]
fn missing_document_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = read_document(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn malformed_document_is_json_error() {
    let err = from_document_str("{\"instance\": ").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}
