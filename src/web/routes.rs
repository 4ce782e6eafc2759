use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(super::handlers::page::index))

        // API endpoints
        .route("/api/summarize", post(super::handlers::api::summarize))
        .route("/api/clear", post(super::handlers::api::clear))
        .route("/api/stream/{session_id}", get(super::sse::stream_events))
        .route("/api/metrics", get(super::handlers::api::metrics))

        // Health check
        .route("/health", get(super::handlers::health::health_check))

        .with_state(state)
}
