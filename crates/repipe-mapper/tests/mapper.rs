//! Class coverage selection and decoding.

use indexmap::IndexMap;
use ndarray::array;
use proptest::prelude::*;
use repipe_config::{Serializable, to_document_string};
use repipe_mapper::{
    ClassCoverageMapper, ClassRecord, HeadPredictions, LabelMode, MapperError, Prediction,
    prefix_stats, rank_by_f1,
};
use serde_json::json;

fn record(class_id: usize, class_name: &str, f1_score: f64, support: u64) -> ClassRecord {
    ClassRecord {
        class_id,
        class_name: class_name.to_string(),
        f1_score,
        precision: f1_score,
        recall: f1_score,
        support,
    }
}

fn intent_records() -> Vec<ClassRecord> {
    vec![
        record(2, "returns", 0.3, 100),
        record(0, "billing", 0.9, 10),
        record(1, "shipping", 0.8, 5),
    ]
}

fn mapper(key: &str, target: f64) -> Result<ClassCoverageMapper, MapperError> {
    let mut classes = IndexMap::new();
    classes.insert(key.to_string(), intent_records());
    ClassCoverageMapper::new(classes, target, "other")
}

#[test]
fn keeps_longest_prefix_meeting_target() {
    let mapper = mapper("intent", 0.85).unwrap();
    let selection = mapper.selection("intent").unwrap();
    assert_eq!(selection.classes, 2);
    assert_eq!(selection.coverage, 15);
    assert_eq!(selection.mean_f1, 0.85);

    let table = mapper.table("intent").unwrap();
    let mapped: Vec<&str> = table
        .entries()
        .iter()
        .map(|entry| entry.mapped_to_class.as_str())
        .collect();
    assert_eq!(mapped, vec!["billing", "shipping", "other"]);
}

#[test]
fn single_label_decodes_argmax() {
    let mapper = mapper("intent", 0.85).unwrap();
    let out = mapper
        .decode("intent", array![[0.1f32, 0.85, 0.05]].view())
        .unwrap();
    assert_eq!(
        out,
        HeadPredictions::Single(vec![Prediction {
            prediction: "shipping".to_string(),
            actual_prediction: "shipping".to_string(),
            confidence: 0.85,
        }])
    );
}

#[test]
fn unreachable_target_fails_construction() {
    let err = mapper("intent", 0.95).unwrap_err();
    assert!(matches!(
        err,
        MapperError::UnsatisfiableThreshold { ref head, best, .. } if head == "intent" && best == 0.9
    ));
}

#[test]
fn multi_label_drops_fallback_classes() {
    let mapper = mapper("multi-label:intent", 0.85).unwrap();
    assert_eq!(
        mapper.heads().collect::<Vec<_>>(),
        vec![("intent", LabelMode::MultiLabel)]
    );
    let out = mapper
        .decode("intent", array![[0.7f32, 0.2, 0.9], [0.1, 0.1, 0.1]].view())
        .unwrap();
    let HeadPredictions::Multi(rows) = out else {
        panic!("expected multi-label predictions");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[0][0].prediction, "billing");
    assert!(rows[1].is_empty());
}

#[test]
fn decoding_reports_unknown_heads() {
    let mapper = mapper("intent", 0.85).unwrap();
    let err = mapper
        .decode("sentiment", array![[1.0f32, 0.0, 0.0]].view())
        .unwrap_err();
    assert!(matches!(err, MapperError::UnknownHead { .. }));
}

#[test]
fn predictions_serialize_per_head() {
    let mapper = mapper("intent", 0.85).unwrap();
    let mut outputs = IndexMap::new();
    outputs.insert("intent".to_string(), array![[0.05f32, 0.05, 0.9]]);
    let decoded = mapper.predictions_to_classes(&outputs).unwrap();
    assert_eq!(
        serde_json::to_value(&decoded).unwrap(),
        json!({"intent": [
            {"prediction": "other", "actual_prediction": "returns", "confidence": 0.9}
        ]})
    );
}

#[test]
fn mapper_document_is_stable() {
    let text = to_document_string(&mapper("intent", 0.85).unwrap().to_dict()).unwrap();
    insta::assert_snapshot!(text, @r#"
    {
      "instance": {
        "cls": "repipe.mapper.ClassCoverageMapper",
        "params": {
          "classes": {
            "multi-class:intent": [
              {
                "class_id": 0,
                "class_name": "billing",
                "f1_score": 0.9,
                "precision": 0.9,
                "recall": 0.9,
                "support": 10
              },
              {
                "class_id": 1,
                "class_name": "shipping",
                "f1_score": 0.8,
                "precision": 0.8,
                "recall": 0.8,
                "support": 5
              },
              {
                "class_id": 2,
                "class_name": "returns",
                "f1_score": 0.3,
                "precision": 0.3,
                "recall": 0.3,
                "support": 100
              }
            ]
          },
          "mean_f1": 0.85,
          "fallback_class": "other"
        }
      }
    }
    "#);
}

#[test]
fn reloaded_mapper_has_same_config_and_tables() {
    let original = mapper("multi-label:intent", 0.85).unwrap();
    let reloaded = ClassCoverageMapper::from_config(&original.to_dict()).unwrap();
    assert_eq!(reloaded.to_dict(), original.to_dict());
    assert_eq!(reloaded.table("intent"), original.table("intent"));
}

#[test]
fn serialized_target_rounds_half_to_even() {
    let mapper = mapper("intent", 0.0625).unwrap();
    assert_eq!(mapper.to_dict()["instance"]["params"]["mean_f1"], json!(0.062));
}

#[test]
fn from_config_rejects_other_classes() {
    let config = json!({"instance": {"cls": "repipe.pipeline.Pipeline", "params": {}}});
    let err = ClassCoverageMapper::from_config(&config).unwrap_err();
    assert!(matches!(err, MapperError::Config(_)));
}

fn records_strategy() -> impl Strategy<Value = Vec<ClassRecord>> {
    prop::collection::vec((0.0f64..1.0, 0u64..1_000), 1..20).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(id, (f1, support))| record(id, &format!("c{id}"), f1, support))
            .collect()
    })
}

proptest! {
    #[test]
    fn coverage_grows_with_prefix_length(records in records_strategy()) {
        let stats = prefix_stats(&rank_by_f1(records));
        for pair in stats.windows(2) {
            prop_assert!(pair[0].coverage <= pair[1].coverage);
        }
    }

    #[test]
    fn every_class_maps_to_itself_or_fallback(
        records in records_strategy(),
        target in 0.0f64..1.0,
    ) {
        let ranked = rank_by_f1(records.clone());
        let stats = prefix_stats(&ranked);
        let expected = stats.iter().rposition(|stat| stat.mean_f1 >= target).map(|pos| pos + 1);

        let mut classes = IndexMap::new();
        classes.insert("head".to_string(), records);
        match (ClassCoverageMapper::new(classes, target, "other"), expected) {
            (Err(MapperError::UnsatisfiableThreshold { .. }), None) => {}
            (Ok(mapper), Some(kept)) => {
                let table = mapper.table("head").unwrap();
                prop_assert_eq!(table.selection().classes, kept);
                for (rank, record) in ranked.iter().enumerate() {
                    let entry = table.get(record.class_id).unwrap();
                    if rank < kept {
                        prop_assert_eq!(&entry.mapped_to_class, &record.class_name);
                    } else {
                        prop_assert_eq!(entry.mapped_to_class.as_str(), "other");
                    }
                }
            }
            (result, expected) => {
                prop_assert!(false, "unexpected {:?} for {:?}", result.map(|_| ()), expected);
            }
        }
    }
}
