//! Deposit domain types.

use chrono::{DateTime, Utc};
use remit_shared::types::{AccountId, Currency, DepositId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::ledger::LedgerTransaction;

/// Status of a deposit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Waiting for the gateway.
    Pending,
    /// Reported paid, not yet credited.
    ///
    /// Confirmation here credits in the same unit that leaves `pending`, so
    /// only an external writer (an operator or an import) stores this status.
    /// It is still accepted as open.
    Confirmed,
    /// Credited to the owning account.
    Completed,
    /// Abandoned or rejected by the gateway.
    Failed,
}

impl DepositStatus {
    /// Returns true if a confirmation may still credit the account.
    #[must_use]
    pub const fn can_confirm(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Outcome reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Still waiting for funds or confirmations.
    Pending,
    /// Funds received with enough confirmations.
    Complete,
    /// Timed out, cancelled or refunded.
    Failed,
}

impl GatewayStatus {
    /// Maps a numeric gateway status code.
    ///
    /// Codes of 100 and above, and 2 (queued for payout), mean complete.
    /// Negative codes mean failed. Everything else is still pending.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        if code >= 100 || code == 2 {
            Self::Complete
        } else if code < 0 {
            Self::Failed
        } else {
            Self::Pending
        }
    }
}

/// A tracked request to fund an account through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Deposit ID.
    pub id: DepositId,
    /// Gateway transaction id, set once the gateway responds.
    pub gateway_txn_id: Option<String>,
    /// Account to credit.
    pub account_id: AccountId,
    /// Amount to credit.
    pub amount: Decimal,
    /// Currency the payer sends.
    pub currency: Currency,
    /// Funding address supplied by the gateway.
    pub address: Option<String>,
    /// Hosted checkout page supplied by the gateway.
    pub checkout_url: Option<String>,
    /// Current status.
    pub status: DepositStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the funding address stops accepting payment.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the credit was applied.
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Result of confirming a deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositConfirmation {
    /// This call credited the account.
    Credited {
        /// The request, now completed.
        deposit: DepositRequest,
        /// The deposit transaction.
        transaction: LedgerTransaction,
        /// The owner after the credit.
        account: Account,
    },
    /// An earlier delivery already credited the account.
    AlreadyProcessed {
        /// Gateway transaction id of the duplicate.
        gateway_txn_id: String,
    },
}

impl DepositConfirmation {
    /// Returns true if this call moved money.
    #[must_use]
    pub const fn is_credited(&self) -> bool {
        matches!(self, Self::Credited { .. })
    }
}

/// Result of applying a verified gateway status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayUpdate {
    /// The gateway reported completion.
    Confirmed(DepositConfirmation),
    /// The request was marked failed.
    Failed(DepositRequest),
    /// Nothing to do yet.
    Pending(DepositRequest),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, GatewayStatus::Complete)]
    #[case(150, GatewayStatus::Complete)]
    #[case(2, GatewayStatus::Complete)]
    #[case(0, GatewayStatus::Pending)]
    #[case(1, GatewayStatus::Pending)]
    #[case(3, GatewayStatus::Pending)]
    #[case(99, GatewayStatus::Pending)]
    #[case(-1, GatewayStatus::Failed)]
    #[case(-2, GatewayStatus::Failed)]
    fn test_gateway_status_from_code(#[case] code: i32, #[case] expected: GatewayStatus) {
        assert_eq!(GatewayStatus::from_code(code), expected);
    }

    #[test]
    fn test_deposit_status_transitions() {
        assert!(DepositStatus::Pending.can_confirm());
        assert!(DepositStatus::Confirmed.can_confirm());
        assert!(!DepositStatus::Completed.can_confirm());
        assert!(!DepositStatus::Failed.can_confirm());

        assert!(DepositStatus::Completed.is_terminal());
        assert!(DepositStatus::Failed.is_terminal());
        assert!(!DepositStatus::Pending.is_terminal());
    }
}
