//! Mapping-level steps and the data they exchange.

use repipe_config::Serializable;

use crate::error::{PipelineError, Result};
use crate::field::{FieldMap, FieldValue};

/// Data flowing between pipeline steps.
#[derive(Debug, Clone, PartialEq)]
pub enum StepData {
    /// The evolving field mapping.
    Fields(FieldMap),
    /// A finished, ordered feature list.
    Features(Vec<FieldValue>),
}

impl StepData {
    pub fn as_fields(&self, step: &str) -> Result<&FieldMap> {
        match self {
            Self::Fields(fields) => Ok(fields),
            Self::Features(_) => Err(features_received(step)),
        }
    }

    pub fn into_fields(self, step: &str) -> Result<FieldMap> {
        match self {
            Self::Fields(fields) => Ok(fields),
            Self::Features(_) => Err(features_received(step)),
        }
    }

    pub fn into_features(self) -> Option<Vec<FieldValue>> {
        match self {
            Self::Features(features) => Some(features),
            Self::Fields(_) => None,
        }
    }
}

fn features_received(step: &str) -> PipelineError {
    PipelineError::invalid_input(
        step,
        "expected a field mapping, received a finished feature list",
    )
}

/// A pipeline stage operating on [`StepData`].
///
/// Data is passed by value: a step consumes the mapping it receives and returns
/// it, usually with one field added or overwritten.
pub trait Step: Serializable + Send + Sync {
    fn fit(&mut self, data: &StepData) -> Result<()>;

    fn transform(&self, data: StepData) -> Result<StepData>;

    /// Fit on `data`, then transform it.
    fn fit_transform(&mut self, data: StepData) -> Result<StepData> {
        self.fit(&data)?;
        self.transform(data)
    }

    /// Human-readable name for logging and summaries.
    fn step_name(&self) -> String;
}
