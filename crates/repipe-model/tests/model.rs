//! A model bundle scoring one-hot features with a pass-through backend.

use indexmap::IndexMap;
use ndarray::Array2;
use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};
use repipe_config::{ConfigError, Serializable};
use repipe_mapper::{ClassCoverageMapper, ClassRecord, HeadPredictions};
use repipe_model::{InferenceBackend, Model, ModelError, Result};
use repipe_pipeline::{FeatureSelector, FieldValue, Pipeline, TransformStep};
use repipe_transforms::{OneHotEncoderAdapter, default_registry};

/// Scores each row with its own one-hot encoding.
struct EchoBackend;

impl InferenceBackend for EchoBackend {
    fn output_names(&self) -> Vec<String> {
        vec!["intent".to_string()]
    }

    fn predict(&self, features: &[FieldValue]) -> Result<Vec<Array2<f32>>> {
        match features.first() {
            Some(FieldValue::Matrix(matrix)) => Ok(vec![matrix.clone()]),
            _ => Err(ModelError::backend("expected one dense feature matrix")),
        }
    }
}

/// Declares more outputs than it returns.
struct ShortBackend;

impl InferenceBackend for ShortBackend {
    fn output_names(&self) -> Vec<String> {
        vec!["intent".to_string(), "urgency".to_string()]
    }

    fn predict(&self, _features: &[FieldValue]) -> Result<Vec<Array2<f32>>> {
        Ok(Vec::new())
    }
}

fn frame(values: &[&str]) -> DataFrame {
    let values: Vec<String> = values.iter().map(|value| (*value).to_string()).collect();
    DataFrame::new(vec![Series::new("intent".into(), values).into_column()]).unwrap()
}

fn fitted_model() -> Model {
    let mut pipeline = Pipeline::new()
        .add_step(Box::new(TransformStep::new(
            "intent_1h",
            ["intent"],
            Box::new(OneHotEncoderAdapter::default()),
        )))
        .add_step(Box::new(FeatureSelector::new(["intent_1h"])));
    // Categories sort to billing=0, returns=1, shipping=2.
    pipeline.fit(&frame(&["shipping", "billing", "returns"])).unwrap();

    let records = [("billing", 0.9, 10), ("returns", 0.3, 100), ("shipping", 0.8, 5)]
        .into_iter()
        .enumerate()
        .map(|(class_id, (class_name, f1_score, support))| ClassRecord {
            class_id,
            class_name: class_name.to_string(),
            f1_score,
            precision: f1_score,
            recall: f1_score,
            support,
        })
        .collect();
    let mut classes = IndexMap::new();
    classes.insert("intent".to_string(), records);
    let mapper = ClassCoverageMapper::new(classes, 0.85, "other").unwrap();

    Model::new("models/intent.bin", pipeline, mapper, Box::new(EchoBackend))
}

fn labels(predictions: &IndexMap<String, HeadPredictions>) -> Vec<(String, String)> {
    let Some(HeadPredictions::Single(rows)) = predictions.get("intent") else {
        panic!("expected single-label predictions for 'intent'");
    };
    rows.iter()
        .map(|row| (row.prediction.clone(), row.actual_prediction.clone()))
        .collect()
}

#[test]
fn predicts_labels_through_pipeline_backend_and_mapper() {
    let model = fitted_model();
    let predictions = model.predict(&frame(&["Billing", "returns"])).unwrap();
    assert_eq!(
        labels(&predictions),
        vec![
            ("billing".to_string(), "billing".to_string()),
            ("other".to_string(), "returns".to_string()),
        ]
    );
}

#[test]
fn saved_model_reloads_with_caller_backend() {
    let model = fitted_model();
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("model.json");
    model.save(&document).unwrap();

    let mut requested = None;
    let reloaded = Model::load(&document, default_registry(), |path| {
        requested = Some(path.to_string());
        Ok(Box::new(EchoBackend) as Box<dyn InferenceBackend>)
    })
    .unwrap();

    assert_eq!(requested.as_deref(), Some("models/intent.bin"));
    assert_eq!(reloaded.to_dict(), model.to_dict());
    let input = frame(&["shipping", "billing"]);
    assert_eq!(
        reloaded.predict(&input).unwrap(),
        model.predict(&input).unwrap()
    );
}

#[test]
fn backend_load_failures_propagate() {
    let config = fitted_model().to_dict();
    let err = Model::from_config(&config, default_registry(), |_| {
        Err(ModelError::backend("weights not found"))
    })
    .err()
    .unwrap();
    assert!(matches!(err, ModelError::Backend { .. }));
}

#[test]
fn output_count_must_match_names() {
    let config = fitted_model().to_dict();
    let model = Model::from_config(&config, default_registry(), |_| {
        Ok(Box::new(ShortBackend) as Box<dyn InferenceBackend>)
    })
    .unwrap();
    let err = model.predict(&frame(&["billing"])).unwrap_err();
    assert!(matches!(
        err,
        ModelError::OutputCount {
            expected: 2,
            found: 0
        }
    ));
}

fn construction_message(config: &serde_json::Value) -> String {
    let err = Model::from_config(config, default_registry(), |_| {
        Ok(Box::new(EchoBackend) as Box<dyn InferenceBackend>)
    })
    .err()
    .unwrap();
    match err {
        ModelError::Config(ConfigError::Construction { class, message }) => {
            assert_eq!(class, Model::CLASS);
            message
        }
        other => panic!("expected a construction error, got {other}"),
    }
}

#[test]
fn unexpected_parameters_are_rejected() {
    let mut config = fitted_model().to_dict();
    config["instance"]["params"]["weights"] = serde_json::json!("extra.bin");
    assert_eq!(
        construction_message(&config),
        "unexpected parameter 'weights'"
    );
}

#[test]
fn parameter_errors_use_the_shared_wording() {
    let mut config = fitted_model().to_dict();
    config["instance"]["params"]["path"] = serde_json::json!(7);
    assert_eq!(
        construction_message(&config),
        "parameter 'path' must be a string, found number"
    );

    let mut config = fitted_model().to_dict();
    config["instance"]["params"]
        .as_object_mut()
        .unwrap()
        .shift_remove("output_mapper");
    assert_eq!(
        construction_message(&config),
        "missing required parameter 'output_mapper'"
    );
}
