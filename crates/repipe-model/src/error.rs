use repipe_config::ConfigError;
use repipe_mapper::MapperError;
use repipe_pipeline::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("pipeline must end with a feature selector, but produced named fields")]
    NotFeatures,

    #[error("backend returned {found} outputs for {expected} output names")]
    OutputCount { expected: usize, found: usize },

    #[error("inference backend failed: {message}")]
    Backend { message: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ModelError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
