use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;
use ndarray::Array2;
use polars::prelude::DataFrame;
use repipe_config::{
    ConfigError, ConfigValue, InstanceDescriptor, Loaded, Params, Serializable, read_document,
    write_document,
};
use repipe_mapper::{ClassCoverageMapper, HeadPredictions};
use repipe_pipeline::{
    ComponentRegistry, FieldMap, FieldValue, Pipeline, StepData, load_pipeline,
};
use serde_json::json;
use tracing::{debug, info};

use crate::backend::InferenceBackend;
use crate::error::{ModelError, Result};

/// A fitted pipeline, the model that scores its features and the mapper that
/// labels the scores.
pub struct Model {
    path: String,
    pipeline: Pipeline,
    mapper: ClassCoverageMapper,
    backend: Box<dyn InferenceBackend>,
}

impl Model {
    pub const CLASS: &'static str = "repipe.model.Model";

    pub fn new(
        path: impl Into<String>,
        pipeline: Pipeline,
        mapper: ClassCoverageMapper,
        backend: Box<dyn InferenceBackend>,
    ) -> Self {
        Self {
            path: path.into(),
            pipeline,
            mapper,
            backend,
        }
    }

    /// Rebuild a model from its instance descriptor.
    ///
    /// The pipeline is resolved through `registry`; `load_backend` receives the
    /// stored model path and supplies the backend.
    pub fn from_config<F>(
        config: &ConfigValue,
        registry: &ComponentRegistry,
        load_backend: F,
    ) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<Box<dyn InferenceBackend>>,
    {
        let descriptor = InstanceDescriptor::from_value(config)?.ok_or_else(|| {
            ConfigError::InvalidDescriptor {
                message: "a model must be an instance descriptor".to_string(),
            }
        })?;
        if descriptor.cls != Self::CLASS {
            return Err(ConfigError::InvalidDescriptor {
                message: format!("expected '{}', found '{}'", Self::CLASS, descriptor.cls),
            }
            .into());
        }
        let mut params: Params<()> =
            Params::from_loaded(Self::CLASS, Loaded::from_raw(&descriptor.params))?;
        let path = params.required_str("path")?;
        let pipeline = load_pipeline(&params.required_raw("pipeline")?, registry)?;
        let mapper = ClassCoverageMapper::from_config(&params.required_raw("output_mapper")?)?;
        params.finish()?;

        let backend = load_backend(&path)?;
        info!(path = %path, steps = pipeline.len(), "loaded model");
        Ok(Self::new(path, pipeline, mapper, backend))
    }

    /// Read a model document from disk.
    pub fn load<F>(document: &Path, registry: &ComponentRegistry, load_backend: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<Box<dyn InferenceBackend>>,
    {
        Self::from_config(&read_document(document)?, registry, load_backend)
    }

    pub fn save(&self, document: &Path) -> Result<()> {
        write_document(document, &self.to_dict())?;
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn mapper(&self) -> &ClassCoverageMapper {
        &self.mapper
    }

    /// Label every row of a frame.
    pub fn predict(&self, df: &DataFrame) -> Result<IndexMap<String, HeadPredictions>> {
        self.predict_fields(FieldMap::from_frame(df)?)
    }

    pub fn predict_fields(&self, fields: FieldMap) -> Result<IndexMap<String, HeadPredictions>> {
        let start = Instant::now();
        let StepData::Features(features) = self.pipeline.transform_fields(fields)? else {
            return Err(ModelError::NotFeatures);
        };
        let scores = self.score(&features)?;
        let labeled = self.mapper.predictions_to_classes(&scores)?;
        debug!(
            heads = labeled.len(),
            duration_ms = start.elapsed().as_millis(),
            "predicted"
        );
        Ok(labeled)
    }

    fn score(&self, features: &[FieldValue]) -> Result<IndexMap<String, Array2<f32>>> {
        let names = self.backend.output_names();
        let outputs = self.backend.predict(features)?;
        if outputs.len() != names.len() {
            return Err(ModelError::OutputCount {
                expected: names.len(),
                found: outputs.len(),
            });
        }
        Ok(names.into_iter().zip(outputs).collect())
    }
}

impl Serializable for Model {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "path": self.path,
            "pipeline": self.pipeline.to_dict(),
            "output_mapper": self.mapper.to_dict(),
        })
    }
}
