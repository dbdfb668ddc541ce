use crate::model::host::ModelHost;
use crate::model::labels::Classification;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

/// Shared Application State
#[derive(Clone)]
pub struct AppState {
    pub host: ModelHost,
    pub metrics: Option<PrometheusHandle>,
}

pub const STATUS_MESSAGE: &str = "Hello, World server is up and running";

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

// --- DTOs (Data Transfer Objects) ---

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictResponse {
    pub class: String,
    pub confidence: f32,
}

impl From<Classification> for PredictResponse {
    fn from(classification: Classification) -> Self {
        Self {
            class: classification.label,
            confidence: classification.confidence,
        }
    }
}
