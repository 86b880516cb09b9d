//! The leaf transform capability.

use repipe_config::Serializable;

use crate::error::{PipelineError, Result};
use crate::field::FieldValue;

/// A fit/transform unit operating on positional input fields.
///
/// `transform` must be a pure function of its inputs and the state captured by
/// `fit`; `params` must describe that state completely so the transform can be
/// rebuilt from configuration alone.
pub trait Transform: Serializable + Send + Sync {
    /// Learn state from the input fields. Stateless transforms keep the default.
    fn fit(&mut self, inputs: &[&FieldValue]) -> Result<()> {
        let _ = inputs;
        Ok(())
    }

    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue>;
}

/// Fail unless exactly `expected` inputs were supplied.
pub fn expect_arity(transform: &str, inputs: &[&FieldValue], expected: usize) -> Result<()> {
    if inputs.len() == expected {
        Ok(())
    } else {
        Err(PipelineError::Arity {
            transform: transform.to_string(),
            expected: expected.to_string(),
            found: inputs.len(),
        })
    }
}

/// The single input of a unary transform.
pub fn single_input<'a>(transform: &str, inputs: &[&'a FieldValue]) -> Result<&'a FieldValue> {
    expect_arity(transform, inputs, 1)?;
    Ok(inputs[0])
}

/// The single input of a unary transform, required to be text.
pub fn text_input<'a>(transform: &str, inputs: &[&'a FieldValue]) -> Result<&'a [Option<String>]> {
    let input = single_input(transform, inputs)?;
    input.as_text().ok_or_else(|| {
        PipelineError::invalid_input(
            transform,
            format!("expected a text field, received {}", input.kind()),
        )
    })
}
