//! Named columnar fields threaded through pipeline steps.

use indexmap::IndexMap;
use ndarray::{Array2, Array3};
use polars::prelude::{AnyValue, DataFrame, DataType};

use crate::error::{PipelineError, Result};

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl SparseMatrix {
    /// Build a matrix from per-row `(column, value)` entries.
    ///
    /// Entries are sorted by column within each row; zero values are dropped.
    pub fn from_rows(rows: Vec<Vec<(usize, f32)>>, n_cols: usize) -> Result<Self> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for mut row in rows {
            row.sort_by_key(|(col, _)| *col);
            for (col, value) in row {
                if col >= n_cols {
                    return Err(PipelineError::invalid_input(
                        "SparseMatrix",
                        format!("column {col} out of bounds for {n_cols} columns"),
                    ));
                }
                if value != 0.0 {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }
        Ok(Self {
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Stored `(column, value)` entries of one row.
    pub fn row(&self, index: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let (start, end) = match (self.indptr.get(index), self.indptr.get(index + 1)) {
            (Some(&start), Some(&end)) => (start, end),
            _ => (0, 0),
        };
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.n_rows(), self.n_cols));
        for row in 0..self.n_rows() {
            for (col, value) in self.row(row) {
                dense[[row, col]] = value;
            }
        }
        dense
    }
}

/// The value of one named field.
///
/// Columnar variants hold one entry per row; `Sparse` is carried as an opaque
/// object by the pipeline and only interpreted by transforms that consume it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
    Tokens(Vec<Vec<String>>),
    Sequences(Vec<Vec<i64>>),
    Matrix(Array2<f32>),
    Tensor(Array3<f32>),
    Sparse(SparseMatrix),
}

impl FieldValue {
    /// Convenience constructor for a text column without nulls.
    pub fn text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Text(values.into_iter().map(|value| Some(value.into())).collect())
    }

    pub fn numeric<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::Numeric(values.into_iter().map(Some).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(values) => values.len(),
            Self::Numeric(values) => values.len(),
            Self::Tokens(values) => values.len(),
            Self::Sequences(values) => values.len(),
            Self::Matrix(values) => values.nrows(),
            Self::Tensor(values) => values.shape()[0],
            Self::Sparse(values) => values.n_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Numeric(_) => "numeric",
            Self::Tokens(_) => "tokens",
            Self::Sequences(_) => "sequences",
            Self::Matrix(_) => "matrix",
            Self::Tensor(_) => "tensor",
            Self::Sparse(_) => "sparse",
        }
    }

    /// Shape as reported in summaries: rows first, then inner dimensions.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Matrix(values) => values.shape().to_vec(),
            Self::Tensor(values) => values.shape().to_vec(),
            Self::Sparse(values) => vec![values.n_rows(), values.n_cols()],
            other => vec![other.len()],
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            Self::Text(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Self::Numeric(values) => Some(values),
            _ => None,
        }
    }
}

/// Insertion-ordered mapping of field name to field value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: IndexMap<String, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a data frame column-wise: numeric dtypes become `Numeric`,
    /// everything else is rendered as `Text`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let height = df.height();
        let mut fields = IndexMap::with_capacity(df.width());
        for column in df.get_columns() {
            let value = if is_numeric(column.dtype()) {
                let mut values = Vec::with_capacity(height);
                for idx in 0..height {
                    values.push(any_to_f64(column.get(idx)?));
                }
                FieldValue::Numeric(values)
            } else {
                let mut values = Vec::with_capacity(height);
                for idx in 0..height {
                    values.push(any_to_text(column.get(idx)?));
                }
                FieldValue::Text(values)
            };
            fields.insert(column.name().to_string(), value);
        }
        Ok(Self { fields })
    }

    /// Insert or overwrite a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look up a field that a step requires.
    pub fn require(&self, name: &str) -> Result<&FieldValue> {
        self.fields.get(name).ok_or_else(|| PipelineError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<S: Into<String>> FromIterator<(S, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (S, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Float32(v) => Some(f64::from(v)),
        AnyValue::Float64(v) => Some(v),
        _ => None,
    }
}

fn any_to_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use super::*;

    #[test]
    fn frame_columns_keep_order_and_kind() {
        let df = DataFrame::new(vec![
            Series::new("text".into(), vec![Some("a"), None]).into_column(),
            Series::new("count".into(), vec![Some(3i64), None]).into_column(),
            Series::new("score".into(), vec![0.5f64, 1.5]).into_column(),
        ])
        .unwrap();

        let fields = FieldMap::from_frame(&df).unwrap();

        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["text", "count", "score"]);
        assert_eq!(
            fields.get("text"),
            Some(&FieldValue::Text(vec![Some("a".to_string()), None]))
        );
        assert_eq!(fields.get("count"), Some(&FieldValue::Numeric(vec![Some(3.0), None])));
        assert_eq!(fields.get("score"), Some(&FieldValue::numeric([0.5, 1.5])));
    }

    #[test]
    fn require_reports_missing_field() {
        let fields: FieldMap = [("a", FieldValue::text(["x"]))].into_iter().collect();
        let err = fields.require("b").unwrap_err();
        assert!(matches!(err, PipelineError::MissingField { ref field } if field == "b"));
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut fields: FieldMap = [
            ("a", FieldValue::text(["x"])),
            ("b", FieldValue::text(["y"])),
        ]
        .into_iter()
        .collect();
        fields.insert("a", FieldValue::numeric([1.0]));
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(fields.get("a"), Some(&FieldValue::numeric([1.0])));
    }

    #[test]
    fn sparse_rows_are_sorted_and_densify() {
        let sparse = SparseMatrix::from_rows(vec![vec![(2, 1.0), (0, 0.5)], vec![], vec![(1, 0.0)]], 3)
            .unwrap();
        assert_eq!(sparse.n_rows(), 3);
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.row(0).collect::<Vec<_>>(), vec![(0, 0.5), (2, 1.0)]);
        let dense = sparse.to_dense();
        assert_eq!(dense[[0, 2]], 1.0);
        assert_eq!(dense[[2, 1]], 0.0);
        assert_eq!(FieldValue::Sparse(sparse).shape(), vec![3, 3]);
    }

    #[test]
    fn sparse_rejects_out_of_bounds_column() {
        assert!(SparseMatrix::from_rows(vec![vec![(5, 1.0)]], 3).is_err());
    }
}
