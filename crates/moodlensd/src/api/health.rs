//! Health check endpoint

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub model_loaded: bool,
}

/// GET /health
///
/// Liveness plus whether the emotion model is available. Does not touch the
/// session or the database.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "moodlensd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: state.service.model_loaded(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
