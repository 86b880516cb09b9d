//! Linear pipeline execution.
//!
//! A [`Pipeline`] runs an ordered list of steps over a field mapping built from a
//! data frame. During fitting every step is fitted and then immediately applied,
//! so later steps fit on the outputs of earlier ones. The order of steps is the
//! dependency graph.
//!
//! # Example
//!
//! ```ignore
//! use repipe_pipeline::{FeatureSelector, Pipeline, TransformStep};
//!
//! let mut pipeline = Pipeline::new()
//!     .add_step(Box::new(TransformStep::new("clean", ["text"], scrubber)))
//!     .add_step(Box::new(FeatureSelector::new(["clean"])));
//! let features = pipeline.fit(&df)?;
//! ```

use polars::prelude::DataFrame;
use repipe_config::{ConfigValue, Serializable};
use serde_json::json;
use tracing::{debug, info_span};

use crate::error::Result;
use crate::field::FieldMap;
use crate::step::{Step, StepData};

/// An ordered sequence of steps; itself a step.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub const CLASS: &'static str = "repipe.pipeline.Pipeline";

    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Add a step to the end of the pipeline.
    pub fn add_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.step_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fit every step in order on a data frame and return the final data.
    pub fn fit(&mut self, df: &DataFrame) -> Result<StepData> {
        let fields = FieldMap::from_frame(df)?;
        self.fit_fields(fields)
    }

    /// Run every fitted step in order on a data frame.
    pub fn transform(&self, df: &DataFrame) -> Result<StepData> {
        let fields = FieldMap::from_frame(df)?;
        self.transform_fields(fields)
    }

    pub fn fit_fields(&mut self, fields: FieldMap) -> Result<StepData> {
        self.run_fit(StepData::Fields(fields))
    }

    pub fn transform_fields(&self, fields: FieldMap) -> Result<StepData> {
        self.run_transform(StepData::Fields(fields))
    }

    fn run_fit(&mut self, mut data: StepData) -> Result<StepData> {
        let span = info_span!("pipeline_fit", steps = self.steps.len());
        let _guard = span.enter();
        for step in &mut self.steps {
            debug!(step = %step.step_name(), "fitting step");
            data = step.fit_transform(data)?;
        }
        Ok(data)
    }

    fn run_transform(&self, mut data: StepData) -> Result<StepData> {
        let span = info_span!("pipeline_transform", steps = self.steps.len());
        let _guard = span.enter();
        for step in &self.steps {
            data = step.transform(data)?;
        }
        Ok(data)
    }
}

impl Serializable for Pipeline {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        let steps: Vec<ConfigValue> = self.steps.iter().map(|step| step.to_dict()).collect();
        json!({ "steps": steps })
    }
}

impl Step for Pipeline {
    /// Fitting a nested pipeline threads a copy of the data through its steps.
    fn fit(&mut self, data: &StepData) -> Result<()> {
        self.run_fit(data.clone()).map(|_| ())
    }

    fn transform(&self, data: StepData) -> Result<StepData> {
        self.run_transform(data)
    }

    fn fit_transform(&mut self, data: StepData) -> Result<StepData> {
        self.run_fit(data)
    }

    fn step_name(&self) -> String {
        format!("pipeline[{}]", self.steps.len())
    }
}
