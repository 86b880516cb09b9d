use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while serializing, loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The class identifier of an instance descriptor is not registered.
    #[error("unknown class '{class}': no constructor is registered under this identifier")]
    ClassResolution { class: String },

    /// A registered constructor rejected the parameters it was given.
    #[error("failed to construct '{class}': {message}")]
    Construction { class: String, message: String },

    /// An `instance` entry that does not have the descriptor shape.
    #[error("malformed instance descriptor: {message}")]
    InvalidDescriptor { message: String },

    #[error("failed to access configuration document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn construction(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            class: class.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
