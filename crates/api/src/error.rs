//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use remit_core::deposit::NotificationError;
use remit_core::ledger::LedgerError;
use remit_shared::AppError;
use serde_json::json;
use tracing::error;

/// An `AppError` rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side faults are logged in full and reported generically.
        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "An error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        Self(err.into())
    }
}
