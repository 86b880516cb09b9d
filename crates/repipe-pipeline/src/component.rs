//! Registry glue for pipeline components.
//!
//! Everything a pipeline configuration can name is a [`Component`]: either a
//! leaf [`Transform`] or a mapping-level [`Step`]. Constructors registered in a
//! [`ComponentRegistry`] produce components; the structural steps defined in this
//! crate are added by [`register_builtin`].

use repipe_config::{
    ConfigError, ConfigValue, InstanceDescriptor, Params, Registry, Result as ConfigResult,
    Serializable, kind_of, load,
};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::router::TransformStep;
use crate::selector::FeatureSelector;
use crate::step::Step;
use crate::transform::Transform;

/// A constructed configuration instance.
pub enum Component {
    Transform(Box<dyn Transform>),
    Step(Box<dyn Step>),
}

pub type ComponentRegistry = Registry<Component>;

pub type ComponentParams = Params<Component>;

impl Component {
    pub fn transform(transform: impl Transform + 'static) -> Self {
        Self::Transform(Box::new(transform))
    }

    pub fn step(step: impl Step + 'static) -> Self {
        Self::Step(Box::new(step))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Step(_) => "step",
        }
    }

    /// Unwrap a leaf transform; `owner` is the class asking for it.
    pub fn into_transform(self, owner: &str) -> ConfigResult<Box<dyn Transform>> {
        match self {
            Self::Transform(transform) => Ok(transform),
            Self::Step(step) => Err(ConfigError::construction(
                owner,
                format!("'{}' is a step, expected a transform", step.class_name()),
            )),
        }
    }

    /// Unwrap a mapping-level step; `owner` is the class asking for it.
    pub fn into_step(self, owner: &str) -> ConfigResult<Box<dyn Step>> {
        match self {
            Self::Step(step) => Ok(step),
            Self::Transform(transform) => Err(ConfigError::construction(
                owner,
                format!(
                    "'{}' is a transform, expected a step",
                    transform.class_name()
                ),
            )),
        }
    }
}

impl Serializable for Component {
    fn class_name(&self) -> &'static str {
        match self {
            Self::Transform(transform) => transform.class_name(),
            Self::Step(step) => step.class_name(),
        }
    }

    fn params(&self) -> ConfigValue {
        match self {
            Self::Transform(transform) => transform.params(),
            Self::Step(step) => step.params(),
        }
    }
}

/// Register the structural steps: pipeline, field router and field projector.
pub fn register_builtin(registry: &mut ComponentRegistry) {
    registry.register(Pipeline::CLASS, build_pipeline_component);
    registry.register(TransformStep::CLASS, build_transform_step);
    registry.register(FeatureSelector::CLASS, build_feature_selector);
}

fn build_pipeline(mut params: ComponentParams) -> ConfigResult<Pipeline> {
    let class = params.class().to_string();
    let steps = params
        .instance_list("steps")?
        .into_iter()
        .map(|component| component.into_step(&class))
        .collect::<ConfigResult<Vec<_>>>()?;
    params.finish()?;
    Ok(Pipeline::from_steps(steps))
}

fn build_pipeline_component(params: ComponentParams) -> ConfigResult<Component> {
    build_pipeline(params).map(Component::step)
}

fn build_transform_step(mut params: ComponentParams) -> ConfigResult<Component> {
    let out_field = params.required_str("out_field")?;
    let in_fields = params.str_or_list("in_fields")?;
    let transform = params
        .required_instance("transform")?
        .into_transform(TransformStep::CLASS)?;
    params.finish()?;
    Ok(Component::step(TransformStep::new(out_field, in_fields, transform)))
}

fn build_feature_selector(mut params: ComponentParams) -> ConfigResult<Component> {
    let features = params.string_list("features")?;
    params.finish()?;
    Ok(Component::step(FeatureSelector::new(features)))
}

/// Load any mapping-level step from its descriptor.
pub fn load_step(config: &ConfigValue, registry: &ComponentRegistry) -> Result<Box<dyn Step>> {
    let component = repipe_config::load_instance(config, registry)?;
    let class = component.class_name();
    Ok(component.into_step(class)?)
}

/// Load a pipeline descriptor into a concrete [`Pipeline`].
pub fn load_pipeline(config: &ConfigValue, registry: &ComponentRegistry) -> Result<Pipeline> {
    let descriptor =
        InstanceDescriptor::from_value(config)?.ok_or_else(|| ConfigError::InvalidDescriptor {
            message: format!("expected a pipeline descriptor, found {}", kind_of(config)),
        })?;
    if descriptor.cls != Pipeline::CLASS {
        return Err(ConfigError::InvalidDescriptor {
            message: format!(
                "expected class '{}', found '{}'",
                Pipeline::CLASS,
                descriptor.cls
            ),
        }
        .into());
    }
    let params = load(&descriptor.params, registry)?;
    let pipeline = build_pipeline(Params::from_loaded(descriptor.cls, params)?)?;
    tracing::debug!(steps = pipeline.len(), "loaded pipeline");
    Ok(pipeline)
}
