//! Serving result CSVs
//!
//! `/result` is the most recent run; `/results/{id}` addresses one run by the
//! id returned in the `X-Result-Id` header of its upload.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
};
use flarewatch_core::AppError;
use flarewatch_processing::{result_key, LATEST_RESULT_KEY};
use flarewatch_storage::Storage;
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

async fn serve_csv(
    storage: &dyn Storage,
    storage_key: &str,
    attachment_name: Option<&str>,
) -> Result<Response<Body>, HttpAppError> {
    let stream = storage.download_stream(storage_key).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CSV_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache");

    if let Some(name) = attachment_name {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", name),
        );
    }

    let response = builder
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

fn parse_result_id(id: &str) -> Result<Uuid, HttpAppError> {
    Uuid::parse_str(id)
        .map_err(|_| HttpAppError(AppError::InvalidInput("Invalid result id".to_string())))
}

#[tracing::instrument(skip(state), fields(operation = "latest_result"))]
pub async fn latest_result(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, HttpAppError> {
    serve_csv(state.results.as_ref(), LATEST_RESULT_KEY, None).await
}

#[tracing::instrument(skip(state), fields(operation = "download_latest_result"))]
pub async fn download_latest_result(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, HttpAppError> {
    serve_csv(state.results.as_ref(), LATEST_RESULT_KEY, Some(LATEST_RESULT_KEY)).await
}

#[tracing::instrument(skip(state), fields(operation = "get_result"))]
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response<Body>, HttpAppError> {
    let result_id = parse_result_id(&id)?;
    serve_csv(state.results.as_ref(), &result_key(&result_id), None).await
}

#[tracing::instrument(skip(state), fields(operation = "download_result"))]
pub async fn download_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response<Body>, HttpAppError> {
    let result_id = parse_result_id(&id)?;
    let filename = format!("{}.csv", result_id);
    serve_csv(state.results.as_ref(), &result_key(&result_id), Some(&filename)).await
}
