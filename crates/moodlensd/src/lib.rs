//! moodlensd — emotion recognition dashboard daemon.
//!
//! Serves the dashboard page and a small JSON API. Photos go through a single
//! inference engine thread; results are stored per user in SQLite.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;
use moodlens_store::Store;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod engine;
pub mod identity;
pub mod service;
pub mod session;

use identity::IdentityResolver;
use service::PredictionService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub store: Store,
    pub identity: Arc<dyn IdentityResolver>,
    /// Signs the session cookie.
    pub cookie_key: Key,
    /// Entries returned by `/api/history`.
    pub history_limit: usize,
    pub max_upload_bytes: usize,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api = Router::new()
        .route("/api/predict", post(api::predict))
        .route("/api/history", get(api::get_history))
        .route("/api/auth", post(api::auth))
        .route("/api/user", get(api::get_user));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(api)
        .merge(public)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
