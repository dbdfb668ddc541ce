use crate::error::InferenceError;
use crate::model::Model;
use ndarray::{Array4, ArrayViewD, Axis};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

// Initialize the global environment for ORT (only needed once)
pub fn init_ort() -> Result<(), InferenceError> {
    let committed = ort::init().with_name("blight-serve").commit()?;
    debug!("ORT environment committed: {}", committed);
    Ok(())
}

/// An ONNX classifier. `Session::run` needs exclusive access, so concurrent
/// requests take turns on the session.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl Model for OnnxModel {
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Inference("model session lock poisoned".to_string()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| InferenceError::Inference("model declares no inputs".to_string()))?;

        let tensor = Tensor::from_array(input)?;
        let outputs = session.run(ort::inputs![input_name => tensor])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        first_row(&dims, data)
    }
}

/// First batch entry of a `[batch, classes, ..]` output, flattened.
fn first_row(dims: &[usize], data: &[f32]) -> Result<Vec<f32>, InferenceError> {
    if dims.len() < 2 {
        return Err(InferenceError::Inference(format!(
            "expected a batched output of shape [batch, classes], got {dims:?}"
        )));
    }
    if dims[0] == 0 {
        return Err(InferenceError::EmptyOutput);
    }

    let output = ArrayViewD::from_shape(dims, data)?;
    let probabilities: Vec<f32> = output.index_axis(Axis(0), 0).iter().copied().collect();
    Ok(probabilities)
}

/// Loads an ONNX model from disk and creates an inference session.
///
/// # Arguments
/// * `model_path` - Path to the .onnx file
pub fn load_model(model_path: impl AsRef<Path>) -> Result<OnnxModel, InferenceError> {
    let path = model_path.as_ref();
    if !path.exists() {
        return Err(InferenceError::ModelNotFound(path.display().to_string()));
    }

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .commit_from_file(path)?;

    info!("Loaded model: {}", path.display());
    for (i, input) in session.inputs.iter().enumerate() {
        info!("  Input {}: {} ({:?})", i, input.name, input.input_type);
    }
    for (i, output) in session.outputs.iter().enumerate() {
        info!("  Output {}: {} ({:?})", i, output.name, output.output_type);
    }

    Ok(OnnxModel {
        session: Mutex::new(session),
    })
}
