use crate::value::{ConfigValue, InstanceDescriptor};

/// A component that can describe how to rebuild itself.
///
/// Implementors declare a stable class identifier and a parameter value holding
/// everything needed for exact reconstruction (fitted vocabularies included,
/// input data excluded). Nested components appear inside `params` as their own
/// [`to_dict`](Serializable::to_dict) output, so serialization recurses through
/// the graph without any central enumeration.
pub trait Serializable {
    /// Fully-qualified identifier this component is registered under.
    fn class_name(&self) -> &'static str;

    /// Reconstruction parameters.
    fn params(&self) -> ConfigValue;

    /// Instance descriptor for this component.
    fn to_dict(&self) -> ConfigValue {
        InstanceDescriptor::new(self.class_name(), self.params()).into_value()
    }
}
