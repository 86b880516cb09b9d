//! Integration tests for the pipeline engine and its serialized form.

use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use proptest::prelude::*;
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable, to_document_string};
use repipe_pipeline::{
    Component, ComponentParams, ComponentRegistry, FeatureSelector, FieldMap, FieldValue,
    Pipeline, PipelineError, Result, Step, StepData, Transform, TransformStep, load_pipeline,
    register_builtin, single_input, text_input,
};
use serde_json::json;

/// Returns its single input unchanged.
struct Echo;

impl Serializable for Echo {
    fn class_name(&self) -> &'static str {
        "tests.Echo"
    }

    fn params(&self) -> ConfigValue {
        json!({})
    }
}

impl Transform for Echo {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        Ok(single_input("Echo", inputs)?.clone())
    }
}

/// Learns a vocabulary on fit and maps text to vocabulary positions.
#[derive(Default)]
struct Indexer {
    vocabulary: Option<Vec<String>>,
}

impl Serializable for Indexer {
    fn class_name(&self) -> &'static str {
        "tests.Indexer"
    }

    fn params(&self) -> ConfigValue {
        json!({ "vocabulary": self.vocabulary })
    }
}

impl Transform for Indexer {
    fn fit(&mut self, inputs: &[&FieldValue]) -> Result<()> {
        let texts = text_input("Indexer", inputs)?;
        let mut vocabulary: Vec<String> = Vec::new();
        for text in texts.iter().flatten() {
            if !vocabulary.contains(text) {
                vocabulary.push(text.clone());
            }
        }
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let texts = text_input("Indexer", inputs)?;
        let vocabulary = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("Indexer"))?;
        Ok(FieldValue::Numeric(
            texts
                .iter()
                .map(|text| {
                    text.as_ref()
                        .and_then(|text| vocabulary.iter().position(|word| word == text))
                        .map(|pos| pos as f64)
                })
                .collect(),
        ))
    }
}

fn build_echo(params: ComponentParams) -> ConfigResult<Component> {
    params.finish()?;
    Ok(Component::transform(Echo))
}

fn build_indexer(mut params: ComponentParams) -> ConfigResult<Component> {
    let vocabulary = match params.take_raw("vocabulary")? {
        Some(ConfigValue::Null) | None => None,
        Some(value) => Some(
            serde_json::from_value(value).map_err(|err| params.error(err.to_string()))?,
        ),
    };
    params.finish()?;
    Ok(Component::transform(Indexer { vocabulary }))
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_builtin(&mut registry);
    registry.register("tests.Echo", build_echo);
    registry.register("tests.Indexer", build_indexer);
    registry
}

fn text_frame(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let cols: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| {
            Series::new(
                name.into(),
                values.iter().copied().map(String::from).collect::<Vec<_>>(),
            )
            .into_column()
        })
        .collect();
    DataFrame::new(cols).unwrap()
}

fn echo_pipeline() -> Pipeline {
    Pipeline::new()
        .add_step(Box::new(TransformStep::new("copy", ["text"], Box::new(Echo))))
        .add_step(Box::new(FeatureSelector::new(["copy"])))
}

#[test]
fn reloaded_echo_pipeline_matches_original_output() {
    let df = text_frame(vec![("text", vec!["a", "b"])]);
    let mut pipeline = echo_pipeline();
    let before = pipeline.fit(&df).unwrap();

    let config = pipeline.to_dict();
    let reloaded = load_pipeline(&config, &registry()).unwrap();
    let after = reloaded.transform(&df).unwrap();

    assert_eq!(before, after);
    assert_eq!(
        after.into_features().unwrap(),
        vec![FieldValue::text(["a", "b"])]
    );
    assert_eq!(reloaded.to_dict(), config);
}

#[test]
fn serialized_pipeline_document_is_stable() {
    let text = to_document_string(&echo_pipeline().to_dict()).unwrap();
    insta::assert_snapshot!(text, @r#"
    {
      "instance": {
        "cls": "repipe.pipeline.Pipeline",
        "params": {
          "steps": [
            {
              "instance": {
                "cls": "repipe.pipeline.TransformStep",
                "params": {
                  "out_field": "copy",
                  "in_fields": [
                    "text"
                  ],
                  "transform": {
                    "instance": {
                      "cls": "tests.Echo",
                      "params": {}
                    }
                  }
                }
              }
            },
            {
              "instance": {
                "cls": "repipe.pipeline.FeatureSelector",
                "params": {
                  "features": [
                    "copy"
                  ]
                }
              }
            }
          ]
        }
      }
    }
    "#);
}

#[test]
fn later_steps_fit_on_earlier_outputs() {
    let df = text_frame(vec![("word", vec!["b", "a", "b"])]);
    let mut pipeline = Pipeline::new()
        .add_step(Box::new(TransformStep::new("copy", ["word"], Box::new(Echo))))
        .add_step(Box::new(TransformStep::new(
            "index",
            ["copy"],
            Box::new(Indexer::default()),
        )));

    let StepData::Fields(fields) = pipeline.fit(&df).unwrap() else {
        panic!("expected fields");
    };
    assert_eq!(
        fields.names().collect::<Vec<_>>(),
        vec!["word", "copy", "index"]
    );
    assert_eq!(
        fields.get("index"),
        Some(&FieldValue::numeric([0.0, 1.0, 0.0]))
    );
}

#[test]
fn fitted_state_survives_round_trip_and_transform_is_idempotent() {
    let train = text_frame(vec![("word", vec!["x", "y"])]);
    let test = text_frame(vec![("word", vec!["y", "z", "x"])]);
    let mut pipeline = Pipeline::new()
        .add_step(Box::new(TransformStep::new(
            "index",
            ["word"],
            Box::new(Indexer::default()),
        )))
        .add_step(Box::new(FeatureSelector::new(["index"])));
    pipeline.fit(&train).unwrap();

    let first = pipeline.transform(&test).unwrap();
    let second = pipeline.transform(&test).unwrap();
    assert_eq!(first, second);

    let reloaded = load_pipeline(&pipeline.to_dict(), &registry()).unwrap();
    assert_eq!(reloaded.transform(&test).unwrap(), first);
    assert_eq!(
        first.into_features().unwrap(),
        vec![FieldValue::Numeric(vec![Some(1.0), None, Some(0.0)])]
    );
}

#[test]
fn transform_before_fit_reports_missing_state() {
    let df = text_frame(vec![("word", vec!["x"])]);
    let pipeline = Pipeline::new().add_step(Box::new(TransformStep::new(
        "index",
        ["word"],
        Box::new(Indexer::default()),
    )));
    let err = pipeline.transform(&df).unwrap_err();
    assert!(matches!(err, PipelineError::NotFitted { .. }));
}

#[test]
fn router_missing_input_field_fails() {
    let df = text_frame(vec![("text", vec!["a"])]);
    let mut pipeline =
        Pipeline::new().add_step(Box::new(TransformStep::new("out", ["absent"], Box::new(Echo))));
    let err = pipeline.fit(&df).unwrap_err();
    assert!(matches!(err, PipelineError::MissingField { ref field } if field == "absent"));
}

#[test]
fn router_propagates_leaf_arity_errors() {
    let df = text_frame(vec![("a", vec!["x"]), ("b", vec!["y"])]);
    let pipeline =
        Pipeline::new().add_step(Box::new(TransformStep::new("out", ["a", "b"], Box::new(Echo))));
    let err = pipeline.transform(&df).unwrap_err();
    assert!(matches!(err, PipelineError::Arity { found: 2, .. }));
}

#[test]
fn bare_string_in_fields_is_normalized() {
    let config = json!({"instance": {"cls": "repipe.pipeline.Pipeline", "params": {"steps": [
        {"instance": {"cls": "repipe.pipeline.TransformStep", "params": {
            "out_field": "copy",
            "in_fields": "text",
            "transform": {"instance": {"cls": "tests.Echo", "params": {}}},
        }}},
    ]}}});
    let pipeline = load_pipeline(&config, &registry()).unwrap();
    let params = pipeline.to_dict();
    assert_eq!(
        params["instance"]["params"]["steps"][0]["instance"]["params"]["in_fields"],
        json!(["text"])
    );
}

#[test]
fn nested_pipelines_run_as_steps() {
    let df = text_frame(vec![("text", vec!["a"])]);
    let inner = Pipeline::new().add_step(Box::new(TransformStep::new(
        "inner_copy",
        ["text"],
        Box::new(Echo),
    )));
    let mut outer = Pipeline::new()
        .add_step(Box::new(inner))
        .add_step(Box::new(FeatureSelector::new(["inner_copy", "text"])));

    let fitted = outer.fit(&df).unwrap();
    let reloaded = load_pipeline(&outer.to_dict(), &registry()).unwrap();
    assert_eq!(reloaded.transform(&df).unwrap(), fitted);
    assert_eq!(reloaded.to_dict(), outer.to_dict());
}

#[test]
fn unknown_transform_class_fails_load() {
    let config = json!({"instance": {"cls": "repipe.pipeline.Pipeline", "params": {"steps": [
        {"instance": {"cls": "repipe.pipeline.TransformStep", "params": {
            "out_field": "copy",
            "in_fields": ["text"],
            "transform": {"instance": {"cls": "tests.Missing", "params": {}}},
        }}},
    ]}}});
    let err = load_pipeline(&config, &registry()).err().unwrap();
    assert!(matches!(
        err,
        PipelineError::Config(repipe_config::ConfigError::ClassResolution { .. })
    ));
}

proptest! {
    #[test]
    fn projector_follows_declared_order(
        names in prop::collection::hash_set("[a-z]{1,6}", 1..8),
        seed in any::<u64>(),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let fields: FieldMap = names
            .iter()
            .map(|name| (name.clone(), FieldValue::text([name.clone()])))
            .collect();

        let mut declared = names.clone();
        let len = declared.len();
        declared.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            declared.reverse();
        }

        let selector = FeatureSelector::new(declared.clone());
        let out = selector
            .transform(StepData::Fields(fields))
            .unwrap()
            .into_features()
            .unwrap();
        let expected: Vec<FieldValue> = declared
            .iter()
            .map(|name| FieldValue::text([name.clone()]))
            .collect();
        prop_assert_eq!(out, expected);
    }
}
