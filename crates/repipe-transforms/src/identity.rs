use repipe_config::{ConfigMap, ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{Component, ComponentParams, FieldValue, Result, Transform, single_input};

/// Passes its single input through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Identity {
    pub const CLASS: &'static str = "repipe.transforms.Identity";

    pub(crate) fn build(params: ComponentParams) -> ConfigResult<Component> {
        params.finish()?;
        Ok(Component::transform(Self))
    }
}

impl Serializable for Identity {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        ConfigValue::Object(ConfigMap::new())
    }
}

impl Transform for Identity {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        Ok(single_input(Self::CLASS, inputs)?.clone())
    }
}
