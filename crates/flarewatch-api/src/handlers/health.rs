use crate::constants::WELCOME_MESSAGE;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub analysis_program: String,
}

pub async fn root() -> &'static str {
    WELCOME_MESSAGE
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        analysis_program: state.pipeline.analyzer().describe(),
    })
}
