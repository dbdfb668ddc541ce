use crate::config::{InputConfig, ModelConfig, OutputKind};
use crate::error::InferenceError;
use crate::model::labels::{softmax, ClassLabels, Classification};
use crate::model::Model;
use crate::preprocessing::image::process_bytes;
use ndarray::Array4;
use std::sync::Arc;

/// The single, read-only model handle shared by every request.
#[derive(Clone)]
pub struct ModelHost {
    model: Arc<dyn Model>,
    labels: ClassLabels,
    input: InputConfig,
    output: OutputKind,
}

impl ModelHost {
    pub fn new(
        model: Arc<dyn Model>,
        labels: ClassLabels,
        input: InputConfig,
        output: OutputKind,
    ) -> Self {
        Self {
            model,
            labels,
            input,
            output,
        }
    }

    pub fn from_config(model: Arc<dyn Model>, config: &ModelConfig) -> Self {
        Self::new(
            model,
            ClassLabels::new(config.labels.clone()),
            config.input,
            config.output,
        )
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Decode, adapt, infer, reduce.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Classification, InferenceError> {
        let tensor = process_bytes(bytes, &self.input)?;
        self.classify_tensor(tensor)
    }

    pub fn classify_tensor(&self, tensor: Array4<f32>) -> Result<Classification, InferenceError> {
        let probabilities = self.probabilities(tensor)?;
        self.labels.classify(&probabilities)
    }

    /// Runs the model and returns a probability vector.
    pub fn probabilities(&self, tensor: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let raw = self.model.predict(tensor)?;
        Ok(match self.output {
            OutputKind::Probabilities => raw,
            OutputKind::Logits => softmax(&raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    struct FixedModel(Vec<f32>);

    impl Model for FixedModel {
        fn predict(&self, _input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    /// Scores bright images as class 0 and dark ones as class 1.
    struct MeanModel;

    impl Model for MeanModel {
        fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            let mean = input.mean().unwrap_or(0.0);
            Ok(vec![mean, 255.0 - mean, 0.0])
        }
    }

    fn host_with(model: impl Model + 'static, output: OutputKind) -> ModelHost {
        ModelHost::new(
            Arc::new(model),
            ClassLabels::default(),
            InputConfig {
                width: 32,
                height: 32,
                ..InputConfig::default()
            },
            output,
        )
    }

    fn png(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, image::Rgb(color));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_classify_bytes() {
        let host = host_with(FixedModel(vec![0.05, 0.9, 0.05]), OutputKind::Probabilities);
        let result = host.classify_bytes(&png([10, 200, 10])).unwrap();
        assert_eq!(result.label, "Late Blight");
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_classify_bytes_rejects_non_image() {
        let host = host_with(FixedModel(vec![1.0, 0.0, 0.0]), OutputKind::Probabilities);
        let result = host.classify_bytes(b"definitely not a png");
        assert!(matches!(result, Err(InferenceError::ImageError(_))));
    }

    #[test]
    fn test_logits_are_normalised() {
        let host = host_with(FixedModel(vec![3.0, 1.0, 0.5]), OutputKind::Logits);
        let probs = host.probabilities(Array4::zeros((1, 32, 32, 3))).unwrap();
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let result = host.classify_tensor(Array4::zeros((1, 32, 32, 3))).unwrap();
        assert_eq!(result.label, "Early Blight");
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[test]
    fn test_output_depends_on_image() {
        let host = host_with(MeanModel, OutputKind::Logits);
        let bright = host.classify_bytes(&png([250, 250, 250])).unwrap();
        let dark = host.classify_bytes(&png([5, 5, 5])).unwrap();
        assert_eq!(bright.label, "Early Blight");
        assert_eq!(dark.label, "Late Blight");
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let host = host_with(MeanModel, OutputKind::Logits);
        let bytes = png([120, 80, 40]);
        let first = host.classify_bytes(&bytes).unwrap();
        let second = host.classify_bytes(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_model_error_propagates() {
        struct Broken;
        impl Model for Broken {
            fn predict(&self, _input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
                Err(InferenceError::Inference("runtime unavailable".to_string()))
            }
        }

        let host = host_with(Broken, OutputKind::Probabilities);
        let result = host.classify_bytes(&png([0, 0, 0]));
        assert!(matches!(result, Err(InferenceError::Inference(_))));
    }
}
