//! The field-projector step.

use repipe_config::{ConfigValue, Serializable};
use serde_json::json;

use crate::error::Result;
use crate::step::{Step, StepData};

/// Projects a fixed ordered list of fields out of the mapping.
///
/// Usually the last step of a pipeline; its output is the feature list handed
/// to a model, in declared order.
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    features: Vec<String>,
}

impl FeatureSelector {
    pub const CLASS: &'static str = "repipe.pipeline.FeatureSelector";

    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

impl Serializable for FeatureSelector {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({ "features": self.features })
    }
}

impl Step for FeatureSelector {
    fn fit(&mut self, _data: &StepData) -> Result<()> {
        Ok(())
    }

    fn transform(&self, data: StepData) -> Result<StepData> {
        let fields = data.into_fields(Self::CLASS)?;
        let selected = self
            .features
            .iter()
            .map(|name| fields.require(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(StepData::Features(selected))
    }

    fn step_name(&self) -> String {
        "features".to_string()
    }
}
