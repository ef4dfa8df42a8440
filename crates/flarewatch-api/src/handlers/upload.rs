use crate::constants::{RESULT_CSV_HEADER, RESULT_ID_HEADER};
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, Response, StatusCode},
};
use flarewatch_core::{AppError, ErrorMetadata};
use flarewatch_processing::PipelineOutcome;
use std::sync::Arc;
use uuid::Uuid;

/// Accept a light curve, analyze it and return the detected flares as JSON.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_light_curve"))]
pub async fn upload_light_curve(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response<Body>, HttpAppError> {
    let upload = extract_multipart_file(multipart).await?;

    tracing::debug!(
        filename = %upload.filename,
        size_bytes = upload.data.len(),
        "Upload received"
    );

    let outcome = state.pipeline.run(upload, Uuid::new_v4()).await?;

    result_response(outcome)
}

/// Encode the full result before anything is sent, so an encoding failure
/// still produces a clean 500.
fn result_response(outcome: PipelineOutcome) -> Result<Response<Body>, HttpAppError> {
    let body = serde_json::to_vec(&outcome.output)
        .map_err(|e| AppError::ResponseEncodingFailed(Box::new(e)))?;

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json");

    let builder = match outcome.csv {
        Ok(artifact) => builder
            .header(RESULT_ID_HEADER, artifact.result_id.to_string())
            .header(RESULT_CSV_HEADER, "written"),
        Err(e) => {
            // The per-run CSV may have landed even though the latest one did not
            let builder = match e.saved_result_id() {
                Some(result_id) => builder.header(RESULT_ID_HEADER, result_id.to_string()),
                None => builder,
            };
            let err = AppError::CsvWriteFailed(Box::new(e));
            tracing::warn!(
                error = %err.detailed_message(),
                error_code = err.error_code(),
                "Returning result without a fully saved CSV"
            );
            builder.header(RESULT_CSV_HEADER, "failed")
        }
    };

    let response = builder
        .body(Body::from(body))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
