//! Declarative configuration values and the instance descriptor wire shape.
//!
//! A configuration value is plain JSON data. One mapping shape is reserved:
//!
//! ```text
//! {"instance": {"cls": "repipe.pipeline.FeatureSelector", "params": {"features": ["x"]}}}
//! ```
//!
//! Any mapping holding the `instance` key is an instance descriptor; every other
//! mapping is plain data.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A declarative configuration value (primitive, sequence, mapping or descriptor).
pub type ConfigValue = serde_json::Value;

/// An ordered mapping of configuration values.
pub type ConfigMap = serde_json::Map<String, ConfigValue>;

/// Key marking a mapping as an instance descriptor.
pub const INSTANCE_KEY: &str = "instance";

/// Reconstruction recipe for one live component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    /// Fully-qualified class identifier resolved through a registry.
    pub cls: String,
    /// Constructor parameters, usually a mapping.
    #[serde(default = "empty_params")]
    pub params: ConfigValue,
}

fn empty_params() -> ConfigValue {
    ConfigValue::Object(ConfigMap::new())
}

impl InstanceDescriptor {
    pub fn new(cls: impl Into<String>, params: ConfigValue) -> Self {
        Self {
            cls: cls.into(),
            params,
        }
    }

    /// Lower the descriptor into its `{"instance": {...}}` configuration form.
    pub fn into_value(self) -> ConfigValue {
        let mut inner = ConfigMap::new();
        inner.insert("cls".to_string(), ConfigValue::String(self.cls));
        inner.insert("params".to_string(), self.params);
        let mut outer = ConfigMap::new();
        outer.insert(INSTANCE_KEY.to_string(), ConfigValue::Object(inner));
        ConfigValue::Object(outer)
    }

    /// Parse a descriptor out of a configuration value.
    ///
    /// Returns `Ok(None)` for anything that is not a descriptor mapping.
    pub fn from_value(value: &ConfigValue) -> Result<Option<Self>> {
        match value {
            ConfigValue::Object(map) => match map.get(INSTANCE_KEY) {
                Some(entry) => Self::from_instance_entry(entry).map(Some),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Parse the value stored under the `instance` key.
    pub fn from_instance_entry(entry: &ConfigValue) -> Result<Self> {
        let ConfigValue::Object(inner) = entry else {
            return Err(ConfigError::InvalidDescriptor {
                message: format!("expected a mapping under '{INSTANCE_KEY}', found {}", kind_of(entry)),
            });
        };
        let cls = match inner.get("cls") {
            Some(ConfigValue::String(cls)) => cls.clone(),
            Some(other) => {
                return Err(ConfigError::InvalidDescriptor {
                    message: format!("'cls' must be a string, found {}", kind_of(other)),
                });
            }
            None => {
                return Err(ConfigError::InvalidDescriptor {
                    message: "missing 'cls'".to_string(),
                });
            }
        };
        if let Some(key) = inner.keys().find(|key| *key != "cls" && *key != "params") {
            return Err(ConfigError::InvalidDescriptor {
                message: format!("unexpected key '{key}' in descriptor for '{cls}'"),
            });
        }
        let params = inner.get("params").cloned().unwrap_or_else(empty_params);
        Ok(Self { cls, params })
    }
}

/// True if the value is a mapping carrying the instance descriptor key.
pub fn is_instance_descriptor(value: &ConfigValue) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key(INSTANCE_KEY))
}

/// Short human name of a configuration value's kind, for error messages.
pub fn kind_of(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "boolean",
        ConfigValue::Number(_) => "number",
        ConfigValue::String(_) => "string",
        ConfigValue::Array(_) => "sequence",
        ConfigValue::Object(map) if map.contains_key(INSTANCE_KEY) => "instance descriptor",
        ConfigValue::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_lowers_to_instance_mapping() {
        let value = InstanceDescriptor::new("a.B", json!({"x": 1})).into_value();
        assert_eq!(value, json!({"instance": {"cls": "a.B", "params": {"x": 1}}}));
        assert!(is_instance_descriptor(&value));
    }

    #[test]
    fn missing_params_default_to_empty_mapping() {
        let parsed = InstanceDescriptor::from_value(&json!({"instance": {"cls": "a.B"}}))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.params, json!({}));
    }

    #[test]
    fn plain_mapping_is_not_a_descriptor() {
        assert!(InstanceDescriptor::from_value(&json!({"cls": "a.B"})).unwrap().is_none());
        assert!(InstanceDescriptor::from_value(&json!([1, 2])).unwrap().is_none());
    }

    #[test]
    fn non_string_class_is_rejected() {
        let err = InstanceDescriptor::from_value(&json!({"instance": {"cls": 3}})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDescriptor { .. }));
    }

    #[test]
    fn kind_names() {
        assert_eq!(kind_of(&json!(null)), "null");
        assert_eq!(kind_of(&json!({"instance": {}})), "instance descriptor");
        assert_eq!(kind_of(&json!({"a": 1})), "mapping");
    }
}
