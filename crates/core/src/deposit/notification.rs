//! Gateway notification authentication.
//!
//! The gateway signs each notification body with HMAC-SHA512 keyed by a shared
//! secret and sends the hex digest alongside it. Nothing from a notification is
//! acted upon until that signature and the merchant id check out.

use hmac::{Hmac, Mac};
use remit_shared::{AppError, GatewayConfig};
use serde::Deserialize;
use sha2::Sha512;
use thiserror::Error;

use super::types::GatewayStatus;

type HmacSha512 = Hmac<Sha512>;

/// Reasons a notification is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// No notification secret is configured, so nothing can be trusted.
    #[error("notification secret is not configured")]
    SecretNotConfigured,

    /// The signature header is absent.
    #[error("missing notification signature")]
    MissingSignature,

    /// The signature does not match the body.
    #[error("invalid notification signature")]
    InvalidSignature,

    /// The notification is addressed to another merchant.
    #[error("notification is for merchant {0}")]
    MerchantMismatch(String),

    /// The body could not be decoded.
    #[error("malformed notification: {0}")]
    Malformed(String),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::SecretNotConfigured
            | NotificationError::MissingSignature
            | NotificationError::InvalidSignature => Self::Unauthorized(err.to_string()),
            NotificationError::MerchantMismatch(_) | NotificationError::Malformed(_) => {
                Self::Validation(err.to_string())
            }
        }
    }
}

/// Decoded notification fields the ledger cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayNotification {
    /// Notification type, `"api"` for payment updates.
    #[serde(default)]
    pub ipn_mode: Option<String>,
    /// Merchant the notification is addressed to.
    pub merchant: String,
    /// Gateway transaction id.
    pub txn_id: String,
    /// Numeric gateway status.
    pub status: i32,
    /// Human-readable gateway status.
    #[serde(default)]
    pub status_text: Option<String>,
}

impl GatewayNotification {
    /// Status mapped onto the deposit lifecycle.
    #[must_use]
    pub const fn gateway_status(&self) -> GatewayStatus {
        GatewayStatus::from_code(self.status)
    }
}

/// Verifies notifications against the shared secret and merchant id.
#[derive(Clone)]
pub struct NotificationVerifier {
    secret: Vec<u8>,
    merchant_id: String,
}

impl std::fmt::Debug for NotificationVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationVerifier")
            .field("merchant_id", &self.merchant_id)
            .finish_non_exhaustive()
    }
}

impl NotificationVerifier {
    /// Creates a verifier.
    pub fn new(secret: impl Into<Vec<u8>>, merchant_id: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            merchant_id: merchant_id.into(),
        }
    }

    /// Builds the verifier from gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.ipn_secret.as_bytes(), config.merchant_id.clone())
    }

    fn mac(&self) -> Result<HmacSha512, NotificationError> {
        if self.secret.is_empty() {
            return Err(NotificationError::SecretNotConfigured);
        }
        HmacSha512::new_from_slice(&self.secret)
            .map_err(|_| NotificationError::SecretNotConfigured)
    }

    /// Hex HMAC-SHA512 of `body`.
    ///
    /// # Errors
    ///
    /// Returns `SecretNotConfigured` if the secret is empty.
    pub fn sign(&self, body: &[u8]) -> Result<String, NotificationError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks `signature` (hex, any case) against `body` in constant time.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is absent, undecodable or wrong.
    pub fn verify_signature(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), NotificationError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(NotificationError::MissingSignature)?;
        let expected =
            hex::decode(signature).map_err(|_| NotificationError::InvalidSignature)?;

        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| NotificationError::InvalidSignature)
    }

    /// Checks that the notification is addressed to this merchant.
    ///
    /// # Errors
    ///
    /// Returns `MerchantMismatch` otherwise.
    pub fn check_merchant(
        &self,
        notification: &GatewayNotification,
    ) -> Result<(), NotificationError> {
        if notification.merchant == self.merchant_id {
            Ok(())
        } else {
            Err(NotificationError::MerchantMismatch(
                notification.merchant.clone(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"ipn_mode=api&merchant=m-1&status=100&txn_id=CP123";

    fn verifier() -> NotificationVerifier {
        NotificationVerifier::new("ipn-secret", "m-1")
    }

    #[test]
    fn test_sign_then_verify() {
        let verifier = verifier();
        let signature = verifier.sign(BODY).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verifier.verify_signature(BODY, Some(&signature)).is_ok());
        assert!(
            verifier
                .verify_signature(BODY, Some(&signature.to_uppercase()))
                .is_ok()
        );
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let verifier = verifier();
        let signature = verifier.sign(BODY).unwrap();
        let tampered = b"ipn_mode=api&merchant=m-1&status=100&txn_id=CP124";
        assert_eq!(
            verifier.verify_signature(tampered, Some(&signature)),
            Err(NotificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signature = NotificationVerifier::new("other", "m-1").sign(BODY).unwrap();
        assert_eq!(
            verifier().verify_signature(BODY, Some(&signature)),
            Err(NotificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_missing_or_garbage_signature() {
        let verifier = verifier();
        assert_eq!(
            verifier.verify_signature(BODY, None),
            Err(NotificationError::MissingSignature)
        );
        assert_eq!(
            verifier.verify_signature(BODY, Some("  ")),
            Err(NotificationError::MissingSignature)
        );
        assert_eq!(
            verifier.verify_signature(BODY, Some("not-hex")),
            Err(NotificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_unconfigured_secret_rejects_everything() {
        let verifier = NotificationVerifier::from_config(&GatewayConfig::default());
        assert_eq!(verifier.sign(BODY), Err(NotificationError::SecretNotConfigured));
        assert_eq!(
            verifier.verify_signature(BODY, Some("00")),
            Err(NotificationError::SecretNotConfigured)
        );
    }

    #[test]
    fn test_merchant_check() {
        let verifier = verifier();
        let mut notification = GatewayNotification {
            ipn_mode: Some("api".to_string()),
            merchant: "m-1".to_string(),
            txn_id: "CP123".to_string(),
            status: 100,
            status_text: None,
        };
        assert!(verifier.check_merchant(&notification).is_ok());
        assert_eq!(notification.gateway_status(), GatewayStatus::Complete);

        notification.merchant = "m-2".to_string();
        assert_eq!(
            verifier.check_merchant(&notification),
            Err(NotificationError::MerchantMismatch("m-2".to_string()))
        );
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(AppError::from(NotificationError::InvalidSignature).status_code(), 401);
        assert_eq!(
            AppError::from(NotificationError::MerchantMismatch("x".into())).status_code(),
            400
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(!rendered.contains("ipn-secret"));
    }
}
