//! Class registry mapping identifiers to constructors.
//!
//! A [`Registry`] is populated once, usually at startup, by each component
//! registering a factory under its class identifier. After that it is only read,
//! so a fully built registry can be shared across threads without locking.

use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};
use crate::loaded::Params;

/// Constructor invoked with the loaded parameters of a descriptor.
pub type Factory<T> = fn(Params<T>) -> Result<T>;

/// Registry of constructors indexed by class identifier.
pub struct Registry<T> {
    factories: BTreeMap<&'static str, Factory<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers a factory for a class identifier.
    ///
    /// If a factory is already registered under this identifier, it is replaced.
    pub fn register(&mut self, class: &'static str, factory: Factory<T>) {
        if self.factories.insert(class, factory).is_some() {
            tracing::debug!(class, "replaced registered constructor");
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered class identifiers, sorted.
    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Looks up the factory for a class identifier.
    pub fn resolve(&self, class: &str) -> Result<Factory<T>> {
        self.factories
            .get(class)
            .copied()
            .ok_or_else(|| ConfigError::ClassResolution {
                class: class.to_string(),
            })
    }

    /// Resolves `params.class()` and runs its factory.
    pub fn construct(&self, params: Params<T>) -> Result<T> {
        let factory = self.resolve(params.class())?;
        factory(params)
    }
}
