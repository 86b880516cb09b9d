//! Categorical encoders.

use ndarray::Array2;
use repipe_config::{ConfigMap, ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, PipelineError, Result, SparseMatrix, Transform,
    single_input,
};
use serde_json::{Number, json};
use tracing::debug;

use crate::dtype;

/// Category the text encoder falls back to for unseen values.
const BLANK: &str = "";

/// Learned category lists; text categories are stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub enum Categories {
    Text(Vec<String>),
    Numeric(Vec<Number>),
}

impl Categories {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(values) => values.len(),
            Self::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_config(&self) -> ConfigValue {
        match self {
            Self::Text(values) => json!(values),
            Self::Numeric(values) => json!(values),
        }
    }
}

/// Render a configured category the way text input is matched against it.
fn category_text(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(text) => text.to_lowercase(),
        ConfigValue::Null => "none".to_string(),
        other => other.to_string().to_lowercase(),
    }
}

fn number_value(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

/// Encodes one categorical field as one column per category.
///
/// Text input is lowercased and nulls count as blank. A value that was not
/// seen during fit is mapped to the blank category, which fails when blank was
/// never seen either. Numerical input must match a learned category exactly.
#[derive(Debug, Clone)]
pub struct OneHotEncoderAdapter {
    categories: Option<Categories>,
    dtype: String,
    sparse: bool,
    input_is_numerical: bool,
}

impl Default for OneHotEncoderAdapter {
    fn default() -> Self {
        Self {
            categories: None,
            dtype: "uint8".to_string(),
            sparse: false,
            input_is_numerical: false,
        }
    }
}

impl OneHotEncoderAdapter {
    pub const CLASS: &'static str = "repipe.transforms.OneHotEncoderAdapter";

    pub fn new(sparse: bool, input_is_numerical: bool) -> Self {
        Self {
            sparse,
            input_is_numerical,
            ..Self::default()
        }
    }

    pub fn categories(&self) -> Option<&Categories> {
        self.categories.as_ref()
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let mut encoder = Self::default();
        if let Some(flag) = params.optional_bool("sparse")? {
            encoder.sparse = flag;
        }
        if let Some(flag) = params.optional_bool("input_is_numerical")? {
            encoder.input_is_numerical = flag;
        }
        if let Some(dtype) = params.optional_str("dtype")? {
            if !dtype::is_supported(&dtype) {
                return Err(params.error(format!("unsupported dtype '{dtype}'")));
            }
            encoder.dtype = dtype;
        }
        encoder.categories = match params.take_raw("categories")? {
            None | Some(ConfigValue::Null) => None,
            Some(ConfigValue::Array(items)) if encoder.input_is_numerical => Some(
                Categories::Numeric(
                    items
                        .iter()
                        .map(|item| match item {
                            ConfigValue::Number(number) => Ok(number.clone()),
                            other => Err(params.error(format!(
                                "numerical categories must be numbers, found {other}"
                            ))),
                        })
                        .collect::<ConfigResult<_>>()?,
                ),
            ),
            Some(ConfigValue::Array(items)) => {
                Some(Categories::Text(items.iter().map(category_text).collect()))
            }
            Some(other) => {
                return Err(params.error(format!("'categories' must be a list, found {other}")));
            }
        };
        params.finish()?;
        Ok(Component::transform(encoder))
    }

    fn text_values(&self, input: &FieldValue) -> Result<Vec<String>> {
        let texts = input.as_text().ok_or_else(|| {
            PipelineError::invalid_input(
                Self::CLASS,
                format!("expected a text field, received {}", input.kind()),
            )
        })?;
        Ok(texts
            .iter()
            .map(|text| text.as_deref().unwrap_or(BLANK).to_lowercase())
            .collect())
    }

    fn numeric_values(&self, input: &FieldValue) -> Result<Vec<f64>> {
        let values = input.as_numeric().ok_or_else(|| {
            PipelineError::invalid_input(
                Self::CLASS,
                format!("expected a numeric field, received {}", input.kind()),
            )
        })?;
        values
            .iter()
            .map(|value| {
                value.ok_or_else(|| {
                    PipelineError::invalid_input(Self::CLASS, "null in numerical input")
                })
            })
            .collect()
    }

    /// Category column of every row.
    fn column_indices(&self, categories: &Categories, input: &FieldValue) -> Result<Vec<usize>> {
        match categories {
            Categories::Text(known) => {
                let blank = known.iter().position(|category| category == BLANK);
                self.text_values(input)?
                    .iter()
                    .map(|value| {
                        known
                            .iter()
                            .position(|category| category == value)
                            .or(blank)
                            .ok_or_else(|| {
                                PipelineError::invalid_input(
                                    Self::CLASS,
                                    format!("found unknown category '{value}'"),
                                )
                            })
                    })
                    .collect()
            }
            Categories::Numeric(known) => self
                .numeric_values(input)?
                .iter()
                .map(|value| {
                    known
                        .iter()
                        .position(|category| number_value(category) == *value)
                        .ok_or_else(|| {
                            PipelineError::invalid_input(
                                Self::CLASS,
                                format!("found unknown category {value}"),
                            )
                        })
                })
                .collect(),
        }
    }
}

impl Serializable for OneHotEncoderAdapter {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "categories": self.categories.as_ref().map(Categories::to_config),
            "dtype": self.dtype,
            "sparse": self.sparse,
            "input_is_numerical": self.input_is_numerical,
        })
    }
}

impl Transform for OneHotEncoderAdapter {
    fn fit(&mut self, inputs: &[&FieldValue]) -> Result<()> {
        let input = single_input(Self::CLASS, inputs)?;
        let categories = if self.input_is_numerical {
            let mut values = self.numeric_values(input)?;
            values.sort_by(f64::total_cmp);
            values.dedup();
            Categories::Numeric(
                values
                    .into_iter()
                    .map(|value| {
                        // Integral categories are stored as integers.
                        if value.fract() == 0.0 && value.abs() < 9.0e15 {
                            Ok(Number::from(value as i64))
                        } else {
                            Number::from_f64(value).ok_or_else(|| {
                                PipelineError::invalid_input(Self::CLASS, "non-finite category")
                            })
                        }
                    })
                    .collect::<Result<_>>()?,
            )
        } else {
            let mut values = self.text_values(input)?;
            values.sort();
            values.dedup();
            Categories::Text(values)
        };
        debug!(
            categories = categories.len(),
            "OneHotEncoderAdapter::fit - Done"
        );
        self.categories = Some(categories);
        Ok(())
    }

    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let input = single_input(Self::CLASS, inputs)?;
        let categories = self
            .categories
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted(Self::CLASS))?;
        debug!("OneHotEncoderAdapter::transform - Start");
        let columns = self.column_indices(categories, input)?;
        let out = if self.sparse {
            let rows = columns.iter().map(|&col| vec![(col, 1.0)]).collect();
            FieldValue::Sparse(SparseMatrix::from_rows(rows, categories.len())?)
        } else {
            let mut dense = Array2::zeros((columns.len(), categories.len()));
            for (row, &col) in columns.iter().enumerate() {
                dense[[row, col]] = 1.0;
            }
            FieldValue::Matrix(dense)
        };
        debug!("OneHotEncoderAdapter::transform - Done");
        Ok(out)
    }
}

/// Compresses one-hot rows into the binary digits of the active column index.
///
/// The output width is the bit length of the input width. Digits are written
/// most significant first and left-aligned; rows with several active columns
/// are OR-ed together.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneHotEncodingToBinaryEncoding;

impl OneHotEncodingToBinaryEncoding {
    pub const CLASS: &'static str = "repipe.transforms.OneHotEncodingToBinaryEncoding";

    pub(crate) fn build(params: ComponentParams) -> ConfigResult<Component> {
        params.finish()?;
        Ok(Component::transform(Self))
    }
}

fn bit_length(value: usize) -> usize {
    (usize::BITS - value.leading_zeros()).max(1) as usize
}

impl Serializable for OneHotEncodingToBinaryEncoding {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        ConfigValue::Object(ConfigMap::new())
    }
}

impl Transform for OneHotEncodingToBinaryEncoding {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let (active, n_cols): (Vec<Vec<usize>>, usize) = match single_input(Self::CLASS, inputs)? {
            FieldValue::Sparse(matrix) => (
                (0..matrix.n_rows())
                    .map(|row| matrix.row(row).map(|(col, _)| col).collect())
                    .collect(),
                matrix.n_cols(),
            ),
            FieldValue::Matrix(matrix) => (
                matrix
                    .rows()
                    .into_iter()
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .filter(|(_, value)| **value != 0.0)
                            .map(|(col, _)| col)
                            .collect()
                    })
                    .collect(),
                matrix.ncols(),
            ),
            other => {
                return Err(PipelineError::invalid_input(
                    Self::CLASS,
                    format!("expected a one-hot matrix, received {}", other.kind()),
                ));
            }
        };
        let width = bit_length(n_cols);
        let mut out = Array2::zeros((active.len(), width));
        for (row, columns) in active.iter().enumerate() {
            for &col in columns {
                let digits = bit_length(col);
                for bit in 0..digits {
                    if col >> (digits - 1 - bit) & 1 == 1 {
                        out[[row, bit]] = 1.0;
                    }
                }
            }
        }
        Ok(FieldValue::Matrix(out))
    }
}
