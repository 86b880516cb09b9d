//! Declarative configuration for reproducible pipelines.
//!
//! Live components describe themselves through [`Serializable`] as instance
//! descriptors; [`load`] turns a configuration value back into live instances
//! by resolving class identifiers through a [`Registry`].

pub mod codec;
pub mod document;
pub mod error;
pub mod loaded;
pub mod registry;
pub mod serializable;
pub mod value;

pub use codec::{VERBATIM_PARAMS_CLASS, load, load_descriptor, load_instance};
pub use document::{from_document_str, read_document, to_document_string, write_document};
pub use error::{ConfigError, Result};
pub use loaded::{Loaded, Params};
pub use registry::{Factory, Registry};
pub use serializable::Serializable;
pub use value::{
    ConfigMap, ConfigValue, INSTANCE_KEY, InstanceDescriptor, is_instance_descriptor, kind_of,
};
