use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model not found at path: {0}")]
    ModelNotFound(String),

    #[error("ONNX Runtime error: {0}")]
    OrtError(#[from] ort::Error),

    #[error("Invalid image data: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),

    #[error("Model returned an empty output")]
    EmptyOutput,

    #[error("Predicted class index {index} has no label ({labels} labels configured)")]
    LabelOutOfRange { index: usize, labels: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl InferenceError {
    pub fn status(&self) -> StatusCode {
        match self {
            InferenceError::ImageError(_)
            | InferenceError::Upload(_)
            | InferenceError::PreprocessingError(_) => StatusCode::BAD_REQUEST,
            InferenceError::Multipart(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the error metric.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::ModelNotFound(_) => "model_not_found",
            InferenceError::OrtError(_) => "runtime",
            InferenceError::ImageError(_) => "decode",
            InferenceError::Upload(_) | InferenceError::Multipart(_) => "upload",
            InferenceError::PreprocessingError(_) => "preprocessing",
            InferenceError::ShapeError(_) => "shape",
            InferenceError::EmptyOutput => "empty_output",
            InferenceError::LabelOutOfRange { .. } => "label_out_of_range",
            InferenceError::Inference(_) => "inference",
        }
    }
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_model_not_found_error() {
        let error = InferenceError::ModelNotFound("test_path".to_string());
        assert_eq!(error.to_string(), "Model not found at path: test_path");
    }

    #[test]
    fn test_label_out_of_range_error() {
        let error = InferenceError::LabelOutOfRange {
            index: 5,
            labels: 3,
        };
        assert_eq!(
            error.to_string(),
            "Predicted class index 5 has no label (3 labels configured)"
        );
    }

    #[test]
    fn test_shape_error_conversion() {
        let shape_error = ShapeError::from_kind(ndarray::ErrorKind::OutOfBounds);
        let inference_error = InferenceError::from(shape_error);
        assert!(matches!(inference_error, InferenceError::ShapeError(_)));
        assert_eq!(inference_error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ort_error_conversion() {
        let ort_error = ort::Error::new("test error");
        let inference_error = InferenceError::from(ort_error);
        assert!(matches!(inference_error, InferenceError::OrtError(_)));
        assert_eq!(inference_error.kind(), "runtime");
    }

    #[test]
    fn test_image_error_is_client_error() {
        let image_error =
            image::ImageError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        let inference_error = InferenceError::from(image_error);
        assert!(matches!(inference_error, InferenceError::ImageError(_)));
        assert_eq!(inference_error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_error_response() {
        let response = InferenceError::Upload("missing `file` field".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Upload error: missing `file` field");
    }

    #[tokio::test]
    async fn test_server_error_keeps_raw_text() {
        let response = InferenceError::Inference("worker panicked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Inference failed: worker panicked");
    }
}
