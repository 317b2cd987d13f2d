//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - The gateway notification endpoint that reconciles deposits
//! - Health checks
//! - JSON error responses built from `AppError`

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use remit_core::deposit::NotificationVerifier;
use remit_db::{DepositRepository, ReportRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Deposit reconciliation.
    pub deposits: Arc<DepositRepository>,
    /// Read-only queries.
    pub reports: Arc<ReportRepository>,
    /// Checks notification signatures and merchant ids.
    pub verifier: Arc<NotificationVerifier>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
