//! Ledger error types.
//!
//! Validation errors are raised before anything is written and are never
//! retried. `ConcurrentModification` is internal: the repositories retry it
//! and surface `Conflict` once the attempts run out.

use remit_shared::AppError;
use remit_shared::types::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is not positive, below the minimum, or too precise.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender has no account.
    #[error("Source account not found: {0}")]
    SourceNotFound(String),

    /// Recipient token matches no account.
    #[error("Destination account not found: {0}")]
    DestinationNotFound(String),

    /// Source and destination are the same account.
    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    /// Balance does not cover the amount plus fee.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needs, fee included.
        required: Decimal,
        /// Balance at the time of the check.
        available: Decimal,
    },

    /// Adjustment target matches no account.
    #[error("Target account not found: {0}")]
    TargetNotFound(String),

    // ========== Deposit Errors ==========
    /// No deposit request carries this gateway transaction id.
    #[error("Unknown deposit: {0}")]
    UnknownDeposit(String),

    /// The deposit was already credited.
    #[error("Deposit {0} was already processed")]
    AlreadyProcessed(String),

    /// The deposit is in a terminal state that cannot be credited.
    #[error("Deposit {0} cannot be confirmed")]
    DepositNotConfirmable(String),

    /// The payment gateway refused or failed the request.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    // ========== Concurrency Errors ==========
    /// A compare-and-swap lost against a concurrent writer.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    /// Still conflicting after every retry.
    #[error("Operation kept conflicting after {attempts} attempts")]
    Conflict {
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Storage Errors ==========
    /// Storage is unreachable or failed mid-operation.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::DestinationNotFound(_) => "DESTINATION_NOT_FOUND",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::UnknownDeposit(_) => "UNKNOWN_DEPOSIT",
            Self::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            Self::DepositNotConfirmable(_) => "DEPOSIT_NOT_CONFIRMABLE",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Conflict { .. } => "CONFLICT",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::SelfTransfer => 400,

            // 404 Not Found
            Self::SourceNotFound(_)
            | Self::DestinationNotFound(_)
            | Self::TargetNotFound(_)
            | Self::UnknownDeposit(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::AlreadyProcessed(_)
            | Self::DepositNotConfirmable(_)
            | Self::ConcurrentModification
            | Self::Conflict { .. } => 409,

            // 422 Unprocessable - business rule
            Self::InsufficientFunds { .. } => 422,

            // 502 Bad Gateway
            Self::Gateway(_) => 502,

            // 503 Service Unavailable
            Self::StorageUnavailable(_) => 503,
        }
    }

    /// Returns true if the whole atomic unit should be re-run.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }

    /// Returns true if the caller should treat this as success.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyProcessed(_))
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::BusinessRule(message),
            502 => Self::ExternalService(message),
            503 => Self::StorageUnavailable(message),
            _ => Self::Internal(message),
        }
    }
}
