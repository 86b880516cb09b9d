//! The field-router step.

use std::time::Instant;

use repipe_config::{ConfigValue, Serializable};
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::field::FieldValue;
use crate::step::{Step, StepData};
use crate::transform::Transform;

/// Routes named input fields into a transform and stores its output field.
pub struct TransformStep {
    out_field: String,
    in_fields: Vec<String>,
    transform: Box<dyn Transform>,
}

impl TransformStep {
    pub const CLASS: &'static str = "repipe.pipeline.TransformStep";

    pub fn new<I, S>(out_field: impl Into<String>, in_fields: I, transform: Box<dyn Transform>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            out_field: out_field.into(),
            in_fields: in_fields.into_iter().map(Into::into).collect(),
            transform,
        }
    }

    pub fn out_field(&self) -> &str {
        &self.out_field
    }

    pub fn in_fields(&self) -> &[String] {
        &self.in_fields
    }

    pub fn inner(&self) -> &dyn Transform {
        self.transform.as_ref()
    }
}

impl Serializable for TransformStep {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "out_field": self.out_field,
            "in_fields": self.in_fields,
            "transform": self.transform.to_dict(),
        })
    }
}

impl Step for TransformStep {
    fn fit(&mut self, data: &StepData) -> Result<()> {
        let start = Instant::now();
        let fields = data.as_fields(Self::CLASS)?;
        let inputs = self
            .in_fields
            .iter()
            .map(|name| fields.require(name))
            .collect::<Result<Vec<&FieldValue>>>()?;
        self.transform.fit(&inputs)?;
        info!(
            step = %self.out_field,
            transform = self.transform.class_name(),
            duration_ms = start.elapsed().as_millis(),
            "finished fit-step"
        );
        Ok(())
    }

    fn transform(&self, data: StepData) -> Result<StepData> {
        let start = Instant::now();
        let mut fields = data.into_fields(Self::CLASS)?;
        let output = {
            let inputs = self
                .in_fields
                .iter()
                .map(|name| fields.require(name))
                .collect::<Result<Vec<&FieldValue>>>()?;
            self.transform.transform(&inputs)?
        };
        fields.insert(self.out_field.clone(), output);
        info!(
            step = %self.out_field,
            transform = self.transform.class_name(),
            duration_ms = start.elapsed().as_millis(),
            "finished step"
        );
        Ok(StepData::Fields(fields))
    }

    fn step_name(&self) -> String {
        self.out_field.clone()
    }
}
