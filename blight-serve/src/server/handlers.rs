use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::InferenceError;
use crate::server::types::*;

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE.to_string(),
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn render_metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, InferenceError> {
    let result = match multipart {
        Ok(multipart) => classify_upload(&state, multipart).await,
        Err(rejection) => Err(InferenceError::Upload(rejection.body_text())),
    };

    match result {
        Ok(response) => {
            counter!("predictions_total", "class" => response.class.clone()).increment(1);
            Ok(Json(response))
        }
        Err(err) => {
            counter!("prediction_errors_total", "kind" => err.kind()).increment(1);
            Err(err)
        }
    }
}

async fn classify_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<PredictResponse, InferenceError> {
    // 1. Read upload
    let image_bytes = read_upload(&mut multipart).await?;
    debug!(bytes = image_bytes.len(), "Received upload");

    // 2. Decode, preprocess and infer off the async runtime
    let host = state.host.clone();
    let start = Instant::now();
    let classification = tokio::task::spawn_blocking(move || host.classify_bytes(&image_bytes))
        .await
        .map_err(|e| InferenceError::Inference(e.to_string()))??;
    let duration = start.elapsed();
    histogram!("inference_duration_seconds").record(duration.as_secs_f64());

    info!(
        class = %classification.label,
        confidence = classification.confidence,
        elapsed_ms = duration.as_secs_f64() * 1000.0,
        "Prediction complete"
    );

    Ok(classification.into())
}

/// Returns the bytes of the `file` field, skipping any other fields.
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, InferenceError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }

    Err(InferenceError::Upload(format!(
        "missing `{UPLOAD_FIELD}` field in multipart form"
    )))
}
