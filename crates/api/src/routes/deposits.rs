//! Payment gateway notification endpoint.
//!
//! The gateway posts a form-encoded body and signs it in the `HMAC` header.
//! Nothing in the body is read before the signature checks out.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use remit_core::deposit::{
    DepositConfirmation, GatewayNotification, GatewayUpdate, NotificationError,
};
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the hex HMAC-SHA512 of the raw body.
pub const SIGNATURE_HEADER: &str = "hmac";

/// Body the gateway expects on success.
pub const IPN_OK: &str = "IPN OK";

/// Creates the deposit routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/deposits/notify", post(notify))
}

/// POST `/deposits/notify` - Apply a signed gateway status update.
///
/// Duplicate deliveries of a credited deposit are acknowledged like fresh ones
/// so the gateway stops retrying.
async fn notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = state.verifier.verify_signature(&body, signature) {
        warn!(error = %err, "rejected gateway notification");
        return Err(err.into());
    }

    let notification: GatewayNotification = serde_urlencoded::from_bytes(&body)
        .map_err(|e| NotificationError::Malformed(e.to_string()))?;
    if let Err(err) = state.verifier.check_merchant(&notification) {
        warn!(error = %err, txn_id = %notification.txn_id, "rejected gateway notification");
        return Err(err.into());
    }

    let status = notification.gateway_status();
    match state
        .deposits
        .apply_gateway_status(&notification.txn_id, status)
        .await
    {
        Ok(update) => {
            match &update {
                GatewayUpdate::Confirmed(DepositConfirmation::Credited { deposit, .. }) => {
                    info!(
                        txn_id = %notification.txn_id,
                        deposit_id = %deposit.id,
                        "deposit confirmed by gateway"
                    );
                }
                GatewayUpdate::Confirmed(DepositConfirmation::AlreadyProcessed { .. }) => {
                    debug!(txn_id = %notification.txn_id, "duplicate gateway confirmation");
                }
                GatewayUpdate::Failed(_) => {
                    info!(
                        txn_id = %notification.txn_id,
                        code = notification.status,
                        "deposit failed at gateway"
                    );
                }
                GatewayUpdate::Pending(_) => {
                    debug!(
                        txn_id = %notification.txn_id,
                        status = notification.status_text.as_deref().unwrap_or_default(),
                        "deposit still pending"
                    );
                }
            }
            Ok((StatusCode::OK, IPN_OK))
        }
        Err(err) if err.is_benign() => {
            debug!(txn_id = %notification.txn_id, error = %err, "notification already applied");
            Ok((StatusCode::OK, IPN_OK))
        }
        Err(err) => Err(err.into()),
    }
}
