//! Health check endpoint (unauthenticated)

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};

use crate::health::{self, HealthReport};
use crate::state::AppState;

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = health::check(&state);
    if !report.is_healthy() {
        tracing::debug!(details = ?report.details, "health check unhealthy");
    }
    (report.status_code(), Json(report))
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
