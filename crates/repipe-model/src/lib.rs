//! Deployable prediction bundles.
//!
//! A [`Model`] runs raw records through a fitted pipeline, scores the features
//! with an [`InferenceBackend`] and labels the scores with a class coverage
//! mapper. The bundle serializes like every other component; the backend is
//! referenced by path and supplied by the caller when loading.

pub mod backend;
pub mod error;
pub mod model;

pub use backend::InferenceBackend;
pub use error::{ModelError, Result};
pub use model::Model;
