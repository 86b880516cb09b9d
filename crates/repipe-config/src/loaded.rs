//! Loaded configuration values and typed constructor parameters.
//!
//! [`Loaded`] mirrors [`ConfigValue`] with one extra case: a live instance built
//! from a descriptor. Constructors receive their loaded parameter mapping wrapped
//! in [`Params`], which takes values out by name and reports any mismatch as
//! [`ConfigError::Construction`].

use indexmap::IndexMap;
use serde_json::Number;

use crate::error::{ConfigError, Result};
use crate::value::{ConfigMap, ConfigValue};

/// A configuration value after instance descriptors have been constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Loaded<T>>),
    Map(IndexMap<String, Loaded<T>>),
    Instance(T),
}

impl<T> Loaded<T> {
    /// Lift a configuration value verbatim, without interpreting descriptors.
    pub fn from_raw(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Null => Self::Null,
            ConfigValue::Bool(flag) => Self::Bool(*flag),
            ConfigValue::Number(number) => Self::Number(number.clone()),
            ConfigValue::String(text) => Self::String(text.clone()),
            ConfigValue::Array(items) => Self::List(items.iter().map(Self::from_raw).collect()),
            ConfigValue::Object(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_raw(value)))
                    .collect(),
            ),
        }
    }

    /// Lower plain data back into a configuration value.
    ///
    /// Returns `None` when the value contains a live instance.
    pub fn to_config(&self) -> Option<ConfigValue> {
        Some(match self {
            Self::Null => ConfigValue::Null,
            Self::Bool(flag) => ConfigValue::Bool(*flag),
            Self::Number(number) => ConfigValue::Number(number.clone()),
            Self::String(text) => ConfigValue::String(text.clone()),
            Self::List(items) => ConfigValue::Array(
                items
                    .iter()
                    .map(Self::to_config)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Self::Map(map) => {
                let mut out = ConfigMap::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.to_config()?);
                }
                ConfigValue::Object(out)
            }
            Self::Instance(_) => return None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "sequence",
            Self::Map(_) => "mapping",
            Self::Instance(_) => "instance",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn into_instance(self) -> Option<T> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

/// Named constructor parameters for one class.
pub struct Params<T> {
    class: String,
    values: IndexMap<String, Loaded<T>>,
}

impl<T> Params<T> {
    pub fn new(class: impl Into<String>, values: IndexMap<String, Loaded<T>>) -> Self {
        Self {
            class: class.into(),
            values,
        }
    }

    /// Wrap a loaded `params` value; `null` counts as an empty mapping.
    pub fn from_loaded(class: impl Into<String>, loaded: Loaded<T>) -> Result<Self> {
        let class = class.into();
        match loaded {
            Loaded::Map(values) => Ok(Self { class, values }),
            Loaded::Null => Ok(Self {
                class,
                values: IndexMap::new(),
            }),
            other => Err(ConfigError::construction(
                class,
                format!("params must be a mapping, found {}", other.kind()),
            )),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a construction error attributed to this class.
    pub fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::construction(self.class.clone(), message)
    }

    fn mismatch(&self, key: &str, expected: &str, found: &Loaded<T>) -> ConfigError {
        self.error(format!(
            "parameter '{key}' must be {expected}, found {}",
            found.kind()
        ))
    }

    pub fn take(&mut self, key: &str) -> Option<Loaded<T>> {
        self.values.shift_remove(key)
    }

    pub fn required(&mut self, key: &str) -> Result<Loaded<T>> {
        self.take(key)
            .ok_or_else(|| self.error(format!("missing required parameter '{key}'")))
    }

    /// Take an optional parameter, treating an explicit `null` as absent.
    fn optional(&mut self, key: &str) -> Option<Loaded<T>> {
        self.take(key).filter(|value| !value.is_null())
    }

    pub fn required_str(&mut self, key: &str) -> Result<String> {
        let value = self.required(key)?;
        self.expect_str(key, value)
    }

    pub fn optional_str(&mut self, key: &str) -> Result<Option<String>> {
        self.optional(key)
            .map(|value| self.expect_str(key, value))
            .transpose()
    }

    fn expect_str(&self, key: &str, value: Loaded<T>) -> Result<String> {
        match value {
            Loaded::String(text) => Ok(text),
            other => Err(self.mismatch(key, "a string", &other)),
        }
    }

    pub fn optional_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.optional(key) {
            None => Ok(None),
            Some(Loaded::Bool(flag)) => Ok(Some(flag)),
            Some(other) => Err(self.mismatch(key, "a boolean", &other)),
        }
    }

    pub fn required_u64(&mut self, key: &str) -> Result<u64> {
        let value = self.required(key)?;
        self.expect_u64(key, value)
    }

    pub fn optional_u64(&mut self, key: &str) -> Result<Option<u64>> {
        self.optional(key)
            .map(|value| self.expect_u64(key, value))
            .transpose()
    }

    fn expect_u64(&self, key: &str, value: Loaded<T>) -> Result<u64> {
        match &value {
            Loaded::Number(number) => number
                .as_u64()
                .ok_or_else(|| self.error(format!("parameter '{key}' must be a non-negative integer, found {number}"))),
            other => Err(self.mismatch(key, "a non-negative integer", other)),
        }
    }

    pub fn optional_i64(&mut self, key: &str) -> Result<Option<i64>> {
        match self.optional(key) {
            None => Ok(None),
            Some(Loaded::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.error(format!("parameter '{key}' must be an integer, found {number}"))),
            Some(other) => Err(self.mismatch(key, "an integer", &other)),
        }
    }

    pub fn required_f64(&mut self, key: &str) -> Result<f64> {
        let value = self.required(key)?;
        match value {
            Loaded::Number(number) => number
                .as_f64()
                .ok_or_else(|| self.error(format!("parameter '{key}' is not representable as f64"))),
            other => Err(self.mismatch(key, "a number", &other)),
        }
    }

    /// A string or a list of strings; a bare string becomes a one-element list.
    pub fn str_or_list(&mut self, key: &str) -> Result<Vec<String>> {
        match self.required(key)? {
            Loaded::String(text) => Ok(vec![text]),
            Loaded::List(items) => self.strings(key, items),
            other => Err(self.mismatch(key, "a string or a list of strings", &other)),
        }
    }

    pub fn string_list(&mut self, key: &str) -> Result<Vec<String>> {
        match self.required(key)? {
            Loaded::List(items) => self.strings(key, items),
            other => Err(self.mismatch(key, "a list of strings", &other)),
        }
    }

    fn strings(&self, key: &str, items: Vec<Loaded<T>>) -> Result<Vec<String>> {
        items
            .into_iter()
            .map(|item| match item {
                Loaded::String(text) => Ok(text),
                other => Err(self.mismatch(key, "a list of strings", &other)),
            })
            .collect()
    }

    pub fn required_instance(&mut self, key: &str) -> Result<T> {
        match self.required(key)? {
            Loaded::Instance(instance) => Ok(instance),
            other => Err(self.mismatch(key, "an instance descriptor", &other)),
        }
    }

    pub fn instance_list(&mut self, key: &str) -> Result<Vec<T>> {
        match self.required(key)? {
            Loaded::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Loaded::Instance(instance) => Ok(instance),
                    other => Err(self.mismatch(key, "a list of instance descriptors", &other)),
                })
                .collect(),
            other => Err(self.mismatch(key, "a list of instance descriptors", &other)),
        }
    }

    /// Take a parameter as plain configuration data.
    pub fn take_raw(&mut self, key: &str) -> Result<Option<ConfigValue>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .to_config()
                .map(Some)
                .ok_or_else(|| self.error(format!("parameter '{key}' must be plain data, found an instance"))),
        }
    }

    /// Take a required parameter as plain configuration data.
    pub fn required_raw(&mut self, key: &str) -> Result<ConfigValue> {
        self.take_raw(key)?
            .ok_or_else(|| self.error(format!("missing required parameter '{key}'")))
    }

    /// Remaining parameters, in declaration order.
    pub fn into_remaining(self) -> IndexMap<String, Loaded<T>> {
        self.values
    }

    /// Reject any parameter the constructor did not consume.
    pub fn finish(self) -> Result<()> {
        match self.values.keys().next() {
            None => Ok(()),
            Some(key) => Err(ConfigError::construction(
                self.class,
                format!("unexpected parameter '{key}'"),
            )),
        }
    }
}
