//! Turning raw prediction scores into labeled predictions.

use ndarray::{ArrayView1, ArrayView2};
use serde::Serialize;

use crate::coverage::{CoverageTable, MappedClass, round_to};
use crate::error::{MapperError, Result};

/// Decimal places kept in reported confidences.
const CONFIDENCE_DIGITS: i32 = 6;

/// One labeled prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// The class reported to callers; the fallback class for low-quality classes.
    pub prediction: String,
    /// The class the model actually predicted.
    pub actual_prediction: String,
    pub confidence: f64,
}

impl Prediction {
    fn new(entry: &MappedClass, confidence: f32) -> Self {
        Self {
            prediction: entry.mapped_to_class.clone(),
            actual_prediction: entry.record.class_name.clone(),
            confidence: round_to(f64::from(confidence), CONFIDENCE_DIGITS),
        }
    }
}

/// Decoded predictions of one head, one entry per input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeadPredictions {
    Single(Vec<Prediction>),
    Multi(Vec<Vec<Prediction>>),
}

impl HeadPredictions {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(rows) => rows.len(),
            Self::Multi(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_scores(head: &str, table: &CoverageTable, scores: &ArrayView2<'_, f32>) -> Result<()> {
    if scores.ncols() != table.len() {
        return Err(MapperError::ShapeMismatch {
            head: head.to_string(),
            expected: table.len(),
            found: scores.ncols(),
        });
    }
    if let Some(row) = scores
        .rows()
        .into_iter()
        .position(|row| row.iter().any(|value| !value.is_finite()))
    {
        return Err(MapperError::NonFiniteScore {
            head: head.to_string(),
            row,
        });
    }
    Ok(())
}

fn lookup<'a>(head: &str, table: &'a CoverageTable, class_id: usize) -> Result<&'a MappedClass> {
    table.get(class_id).ok_or_else(|| MapperError::ClassOutOfRange {
        head: head.to_string(),
        class_id,
    })
}

/// Index and value of the first maximum.
fn argmax(row: ArrayView1<'_, f32>) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (idx, &value) in row.iter().enumerate() {
        if value > best.1 {
            best = (idx, value);
        }
    }
    best
}

/// One prediction per row: the highest scoring class, even when it maps to
/// the fallback class.
pub fn decode_single(
    head: &str,
    table: &CoverageTable,
    scores: ArrayView2<'_, f32>,
) -> Result<Vec<Prediction>> {
    check_scores(head, table, &scores)?;
    scores
        .rows()
        .into_iter()
        .map(|row| {
            let (class_id, confidence) = argmax(row);
            Ok(Prediction::new(lookup(head, table, class_id)?, confidence))
        })
        .collect()
}

/// Every class whose score rounds to a non-zero value, minus the classes
/// mapped to `fallback`. Halves round to even, so exactly 0.5 stays inactive.
pub fn decode_multi(
    head: &str,
    table: &CoverageTable,
    fallback: &str,
    scores: ArrayView2<'_, f32>,
) -> Result<Vec<Vec<Prediction>>> {
    check_scores(head, table, &scores)?;
    let mut decoded = Vec::with_capacity(scores.nrows());
    for row in scores.rows() {
        let mut predictions = Vec::new();
        for (class_id, &confidence) in row.iter().enumerate() {
            if confidence.round_ties_even() == 0.0 {
                continue;
            }
            let entry = lookup(head, table, class_id)?;
            if entry.mapped_to_class != fallback {
                predictions.push(Prediction::new(entry, confidence));
            }
        }
        decoded.push(predictions);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::record::ClassRecord;

    fn table() -> CoverageTable {
        let records = (0..3)
            .map(|class_id| ClassRecord {
                class_id,
                class_name: format!("c{class_id}"),
                f1_score: [0.9, 0.8, 0.3][class_id],
                precision: 0.0,
                recall: 0.0,
                support: 1,
            })
            .collect();
        CoverageTable::build("h", records, 0.85, "other").unwrap()
    }

    #[test]
    fn single_label_reports_fallback_rows_too() {
        let scores = array![[0.1f32, 0.2, 0.7], [0.6, 0.3, 0.1]];
        let out = decode_single("h", &table(), scores.view()).unwrap();
        assert_eq!(out[0].prediction, "other");
        assert_eq!(out[0].actual_prediction, "c2");
        assert_eq!(out[1].prediction, "c0");
    }

    #[test]
    fn first_maximum_wins() {
        let scores = array![[0.4f32, 0.4, 0.2]];
        let out = decode_single("h", &table(), scores.view()).unwrap();
        assert_eq!(out[0].actual_prediction, "c0");
    }

    #[test]
    fn exact_half_does_not_activate() {
        let scores = array![[0.5f32, 0.51, 0.0]];
        let out = decode_multi("h", &table(), "other", scores.view()).unwrap();
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].actual_prediction, "c1");
    }

    #[test]
    fn width_must_match_class_count() {
        let scores = array![[0.5f32, 0.5]];
        let err = decode_single("h", &table(), scores.view()).unwrap_err();
        assert!(matches!(
            err,
            MapperError::ShapeMismatch { expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn all_nan_row_is_rejected() {
        let scores = array![[0.1f32, 0.2, 0.7], [f32::NAN, f32::NAN, f32::NAN]];
        let err = decode_single("h", &table(), scores.view()).unwrap_err();
        assert!(matches!(err, MapperError::NonFiniteScore { row: 1, .. }));
    }

    #[test]
    fn infinite_multi_label_score_is_rejected() {
        let scores = array![[f32::INFINITY, 0.0, 0.0]];
        let err = decode_multi("h", &table(), "other", scores.view()).unwrap_err();
        assert!(matches!(err, MapperError::NonFiniteScore { row: 0, .. }));
    }
}
