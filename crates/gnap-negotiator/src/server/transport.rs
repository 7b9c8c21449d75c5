//! HTTP transport.
//!
//! Builds the axum router around a [`GrantEngine`]: grant endpoints, health
//! and readiness probes, request tracing and a per-request timeout.

use std::sync::Arc;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::grant::{GrantEngine, handlers};

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub engine: GrantEngine,
}

/// Create the HTTP router.
pub fn create_router(engine: GrantEngine) -> Router {
    let request_timeout = engine.config().request_timeout;
    let state = Arc::new(HttpState { engine });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/transaction", post(handlers::handle_transaction))
        .route("/interact/{handle}", get(handlers::handle_interaction))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gnap-negotiator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let store = state.engine.store();
    Json(serde_json::json!({
        "status": "ready",
        "service": "gnap-negotiator",
        "version": env!("CARGO_PKG_VERSION"),
        "transactions": store.len().await,
        "pendingInteractions": store.pending_interactions().await
    }))
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({ "error": "request_timeout" })),
        )
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "internal_error" })),
        )
    }
}
