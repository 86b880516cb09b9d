use ndarray::Array2;
use repipe_pipeline::FieldValue;

use crate::error::Result;

/// A trained predictive model.
///
/// `predict` receives the pipeline's feature list and returns one score matrix
/// (rows x classes) per entry of `output_names`, in the same order.
pub trait InferenceBackend: Send + Sync {
    fn output_names(&self) -> Vec<String>;

    fn predict(&self, features: &[FieldValue]) -> Result<Vec<Array2<f32>>>;
}
