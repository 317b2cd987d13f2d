//! Health check endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether the database answered.
    pub database: &'static str,
}

/// Health check handler.
///
/// Answers 503 while the database is unreachable so load balancers drain us.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match state.reports.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "up"),
        Err(err) => {
            warn!(error = %err, "database ping failed");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
