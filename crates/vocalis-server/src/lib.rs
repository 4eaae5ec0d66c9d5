//! Vocalis server library logic.

pub mod api;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vocalis_coach::CoachService;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Generation pipeline.
    pub coach: CoachService,
}

impl AppState {
    pub fn new(coach: CoachService) -> Self {
        Self { coach }
    }
}

/// Maximum request body size (64 KiB). Requests only carry metrics and a line of text.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/practice-line", post(api::practice_line_handler))
        .route("/api/exercise", post(api::exercise_handler))
        .route("/api/vapi/connection", get(api::connection_handler))
        .route("/api/vapi/agent", get(api::agent_handler))
        .route("/api/vapi/calls", get(api::calls_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
