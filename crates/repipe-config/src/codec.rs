//! Recursive interpretation of configuration values into live instances.

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::loaded::{Loaded, Params};
use crate::registry::Registry;
use crate::value::{ConfigValue, INSTANCE_KEY, InstanceDescriptor, kind_of};

/// Class whose `params` are raw vocabulary data rather than nested configuration.
///
/// Descriptors of this class receive their params verbatim; nothing inside them is
/// interpreted as a descriptor.
pub const VERBATIM_PARAMS_CLASS: &str = "repipe.transforms.TokenizerAdapter";

/// Interpret a configuration value against a registry.
///
/// Descriptors are constructed through their registered factory after their
/// params have been loaded depth-first. Plain mappings and sequences are loaded
/// element-wise with order preserved; primitives pass through unchanged. The first
/// failure aborts the whole load.
pub fn load<T>(config: &ConfigValue, registry: &Registry<T>) -> Result<Loaded<T>> {
    match config {
        ConfigValue::Object(map) if map.contains_key(INSTANCE_KEY) => {
            load_instance(config, registry).map(Loaded::Instance)
        }
        ConfigValue::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), load(value, registry)?);
            }
            Ok(Loaded::Map(out))
        }
        ConfigValue::Array(items) => items
            .iter()
            .map(|item| load(item, registry))
            .collect::<Result<Vec<_>>>()
            .map(Loaded::List),
        primitive => Ok(Loaded::from_raw(primitive)),
    }
}

/// Construct one instance from a parsed descriptor.
pub fn load_descriptor<T>(descriptor: &InstanceDescriptor, registry: &Registry<T>) -> Result<T> {
    let factory = registry.resolve(&descriptor.cls)?;
    let params = if descriptor.cls == VERBATIM_PARAMS_CLASS {
        Loaded::from_raw(&descriptor.params)
    } else {
        load(&descriptor.params, registry)?
    };
    tracing::debug!(class = %descriptor.cls, "constructing instance");
    factory(Params::from_loaded(descriptor.cls.clone(), params)?)
}

/// Load a configuration value that must be a single instance descriptor.
pub fn load_instance<T>(config: &ConfigValue, registry: &Registry<T>) -> Result<T> {
    match InstanceDescriptor::from_value(config)? {
        Some(descriptor) => load_descriptor(&descriptor, registry),
        None => Err(ConfigError::InvalidDescriptor {
            message: format!("expected an instance descriptor, found {}", kind_of(config)),
        }),
    }
}
