use ndarray::Array2;
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, PipelineError, Result, Transform, single_input,
};
use serde_json::json;
use tracing::debug;

use crate::dtype;

/// Which end of a sequence padding or truncation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Pre,
    Post,
}

impl Side {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pre" => Some(Self::Pre),
            "post" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

/// Pads or truncates integer sequences into a fixed-width matrix.
#[derive(Debug, Clone)]
pub struct PadSequencesAdapter {
    maxlen: Option<usize>,
    padding: Side,
    truncating: Side,
    value: f64,
    dtype: String,
}

impl Default for PadSequencesAdapter {
    fn default() -> Self {
        Self {
            maxlen: None,
            padding: Side::Pre,
            truncating: Side::Pre,
            value: 0.0,
            dtype: "int32".to_string(),
        }
    }
}

impl PadSequencesAdapter {
    pub const CLASS: &'static str = "repipe.transforms.PadSequencesAdapter";

    pub fn new(maxlen: Option<usize>, padding: Side, truncating: Side) -> Self {
        Self {
            maxlen,
            padding,
            truncating,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let mut adapter = Self::default();
        if let Some(maxlen) = params.optional_u64("maxlen")? {
            adapter.maxlen = Some(
                usize::try_from(maxlen).map_err(|_| params.error("'maxlen' is too large"))?,
            );
        }
        if let Some(padding) = params.optional_str("padding")? {
            adapter.padding = Side::parse(&padding)
                .ok_or_else(|| params.error(format!("padding type '{padding}' not understood")))?;
        }
        if let Some(truncating) = params.optional_str("truncating")? {
            adapter.truncating = Side::parse(&truncating).ok_or_else(|| {
                params.error(format!("truncating type '{truncating}' not understood"))
            })?;
        }
        if params.contains("value") {
            adapter.value = params.required_f64("value")?;
        }
        if let Some(dtype) = params.optional_str("dtype")? {
            if !dtype::is_supported(&dtype) {
                return Err(params.error(format!("unsupported dtype '{dtype}'")));
            }
            adapter.dtype = dtype;
        }
        params.finish()?;
        Ok(Component::transform(adapter))
    }

    fn fill_value(&self) -> f32 {
        if dtype::is_integer(&self.dtype) {
            self.value.trunc() as f32
        } else {
            self.value as f32
        }
    }
}

impl Serializable for PadSequencesAdapter {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "maxlen": self.maxlen,
            "padding": self.padding.as_str(),
            "truncating": self.truncating.as_str(),
            "value": self.value,
            "dtype": self.dtype,
        })
    }
}

impl Transform for PadSequencesAdapter {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let FieldValue::Sequences(sequences) = single_input(Self::CLASS, inputs)? else {
            return Err(PipelineError::invalid_input(
                Self::CLASS,
                "expected integer sequences",
            ));
        };
        debug!("PadSequencesAdapter::transform - Start");
        let width = self
            .maxlen
            .unwrap_or_else(|| sequences.iter().map(Vec::len).max().unwrap_or(0));
        let mut out = Array2::from_elem((sequences.len(), width), self.fill_value());
        for (row, sequence) in sequences.iter().enumerate() {
            if sequence.is_empty() || width == 0 {
                continue;
            }
            let kept = if sequence.len() <= width {
                &sequence[..]
            } else {
                match self.truncating {
                    Side::Pre => &sequence[sequence.len() - width..],
                    Side::Post => &sequence[..width],
                }
            };
            let start = match self.padding {
                Side::Pre => width - kept.len(),
                Side::Post => 0,
            };
            for (offset, value) in kept.iter().enumerate() {
                out[[row, start + offset]] = *value as f32;
            }
        }
        debug!("PadSequencesAdapter::transform - Done");
        Ok(FieldValue::Matrix(out))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn sequences() -> FieldValue {
        FieldValue::Sequences(vec![vec![1, 2, 3], vec![4], vec![]])
    }

    #[test]
    fn pre_padding_and_truncation_by_default() {
        let out = PadSequencesAdapter::new(Some(2), Side::Pre, Side::Pre)
            .transform(&[&sequences()])
            .unwrap();
        assert_eq!(
            out,
            FieldValue::Matrix(array![[2.0, 3.0], [0.0, 4.0], [0.0, 0.0]])
        );
    }

    #[test]
    fn post_padding_and_truncation() {
        let out = PadSequencesAdapter::new(Some(2), Side::Post, Side::Post)
            .with_value(9.0)
            .transform(&[&sequences()])
            .unwrap();
        assert_eq!(
            out,
            FieldValue::Matrix(array![[1.0, 2.0], [4.0, 9.0], [9.0, 9.0]])
        );
    }

    #[test]
    fn width_defaults_to_longest_sequence() {
        let out = PadSequencesAdapter::default()
            .transform(&[&sequences()])
            .unwrap();
        assert_eq!(out.shape(), vec![3, 3]);
    }

    #[test]
    fn rejects_text_input() {
        let err = PadSequencesAdapter::default()
            .transform(&[&FieldValue::text(["a"])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
    }
}
