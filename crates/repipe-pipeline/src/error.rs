use polars::prelude::PolarsError;
use repipe_config::ConfigError;
use thiserror::Error;

/// Errors raised while fitting or running pipeline steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step asked for a field the mapping does not hold.
    #[error("field '{field}' is not present in the field mapping")]
    MissingField { field: String },

    /// A transform received the wrong number of input fields.
    #[error("{transform} expects {expected} input field(s), received {found}")]
    Arity {
        transform: String,
        expected: String,
        found: usize,
    },

    /// A transform received inputs it cannot process.
    #[error("{transform}: {message}")]
    InvalidInput { transform: String, message: String },

    /// `transform` was called on a component that requires fitted state.
    #[error("{transform} must be fitted before transform")]
    NotFitted { transform: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data frame conversion failed: {0}")]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub fn invalid_input(transform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            transform: transform.into(),
            message: message.into(),
        }
    }

    pub fn not_fitted(transform: impl Into<String>) -> Self {
        Self::NotFitted {
            transform: transform.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
