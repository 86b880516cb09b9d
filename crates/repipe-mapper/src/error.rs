use repipe_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    /// Not even the single best class reaches the mean F1 target.
    #[error("head '{head}': no class prefix reaches mean F1 {target} (best is {best})")]
    UnsatisfiableThreshold { head: String, target: f64, best: f64 },

    #[error("head '{head}' has no class records")]
    EmptyHead { head: String },

    #[error("head '{head}': {message}")]
    InvalidRecord { head: String, message: String },

    #[error("unknown output head '{head}'")]
    UnknownHead { head: String },

    #[error("head '{head}': predicted class id {class_id} has no class record")]
    ClassOutOfRange { head: String, class_id: usize },

    #[error("head '{head}': predictions have {found} columns, expected {expected}")]
    ShapeMismatch {
        head: String,
        expected: usize,
        found: usize,
    },

    #[error("head '{head}': row {row} has a non-finite score")]
    NonFiniteScore { head: String, row: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, MapperError>;
