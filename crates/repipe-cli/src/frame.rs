//! CSV input and feature export.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ndarray::ArrayView2;
use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use repipe_pipeline::FieldValue;
use tracing::{debug, warn};

/// Read a CSV file with a single header row into a data frame.
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("open {}", path.display()))?
        .finish()
        .with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "read input");
    Ok(df)
}

/// Flatten one feature into named columns of cell text.
fn feature_columns(index: usize, feature: &FieldValue) -> Option<Vec<(String, Vec<String>)>> {
    let text = |values: Vec<String>| Some(vec![(format!("f{index}"), values)]);
    match feature {
        FieldValue::Text(values) => text(
            values
                .iter()
                .map(|value| value.clone().unwrap_or_default())
                .collect(),
        ),
        FieldValue::Numeric(values) => text(
            values
                .iter()
                .map(|value| value.map(|v| v.to_string()).unwrap_or_default())
                .collect(),
        ),
        FieldValue::Tokens(rows) => text(rows.iter().map(|row| row.join(" ")).collect()),
        FieldValue::Sequences(rows) => text(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect(),
        ),
        FieldValue::Matrix(matrix) => Some(matrix_columns(index, &matrix.view())),
        FieldValue::Sparse(matrix) => Some(matrix_columns(index, &matrix.to_dense().view())),
        FieldValue::Tensor(_) => None,
    }
}

fn matrix_columns(
    index: usize,
    matrix: &ArrayView2<'_, f32>,
) -> Vec<(String, Vec<String>)> {
    matrix
        .columns()
        .into_iter()
        .enumerate()
        .map(|(col, values)| {
            (
                format!("f{index}_{col}"),
                values.iter().map(f32::to_string).collect(),
            )
        })
        .collect()
}

/// Write features as CSV, one row per example. Matrices expand to one column
/// per matrix column; tensors are skipped.
pub fn write_features(path: &Path, features: &[FieldValue]) -> Result<usize> {
    let mut columns = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        match feature_columns(index, feature) {
            Some(expanded) => columns.extend(expanded),
            None => warn!(feature = index, "skipping {} feature in CSV export", feature.kind()),
        }
    }
    let rows = columns.first().map_or(0, |(_, values)| values.len());
    if columns.iter().any(|(_, values)| values.len() != rows) {
        bail!("features have different row counts");
    }

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(columns.iter().map(|(name, _)| name.as_str()))?;
    for row in 0..rows {
        writer.write_record(columns.iter().map(|(_, values)| values[row].as_str()))?;
    }
    writer.flush()?;
    Ok(rows)
}
