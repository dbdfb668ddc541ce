pub mod host;
pub mod labels;
pub mod loader;

use crate::error::InferenceError;
use ndarray::Array4;

/// A loaded classifier. Implementations must be safe to share across request
/// handlers; the probability vector returned is the first row of the output.
pub trait Model: Send + Sync {
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}
