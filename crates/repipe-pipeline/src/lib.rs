//! Feature pipelines over named fields.
//!
//! A [`Pipeline`] threads a [`FieldMap`] through an ordered list of [`Step`]s.
//! [`TransformStep`] routes named fields into a leaf [`Transform`] and stores
//! its output; [`FeatureSelector`] projects the finished feature list. Every
//! piece is [`Serializable`](repipe_config::Serializable) and can be rebuilt
//! through a [`ComponentRegistry`].

pub mod component;
pub mod error;
pub mod field;
pub mod pipeline;
pub mod router;
pub mod selector;
pub mod step;
pub mod transform;

pub use component::{
    Component, ComponentParams, ComponentRegistry, load_pipeline, load_step, register_builtin,
};
pub use error::{PipelineError, Result};
pub use field::{FieldMap, FieldValue, SparseMatrix};
pub use pipeline::Pipeline;
pub use router::TransformStep;
pub use selector::FeatureSelector;
pub use step::{Step, StepData};
pub use transform::{Transform, expect_arity, single_input, text_input};
