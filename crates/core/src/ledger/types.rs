//! Ledger domain types.

use chrono::{DateTime, Utc};
use remit_shared::types::{AccountId, DepositId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::Account;

/// What kind of balance-affecting event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Account to account, fee charged to the sender.
    Transfer,
    /// Gateway-funded credit.
    Deposit,
    /// Funds leaving the system.
    Withdrawal,
    /// Administrative credit.
    AdminCredit,
    /// Administrative debit.
    AdminDebit,
}

impl TransactionKind {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::AdminCredit => "admin_credit",
            Self::AdminDebit => "admin_debit",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Not yet applied.
    Pending,
    /// Applied together with its balance changes.
    Completed,
    /// Rejected.
    Failed,
    /// Withdrawn before completion.
    Cancelled,
}

/// One side of a transaction: an account, or the system itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Counterparty {
    /// Deposits, admin credits and fee sinks.
    System,
    /// A ledger account.
    Account(AccountId),
}

impl Counterparty {
    /// Builds a counterparty from a nullable account reference.
    #[must_use]
    pub fn from_account(account_id: Option<AccountId>) -> Self {
        account_id.map_or(Self::System, Self::Account)
    }

    /// The account, if this side is not the system.
    #[must_use]
    pub const fn account_id(self) -> Option<AccountId> {
        match self {
            Self::System => None,
            Self::Account(id) => Some(id),
        }
    }
}

/// Direction of an administrative adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustDirection {
    /// Add to the balance.
    Credit,
    /// Remove from the balance.
    Debit,
}

impl AdjustDirection {
    /// Transaction kind recorded for this direction.
    #[must_use]
    pub const fn kind(self) -> TransactionKind {
        match self {
            Self::Credit => TransactionKind::AdminCredit,
            Self::Debit => TransactionKind::AdminDebit,
        }
    }
}

impl std::str::FromStr for AdjustDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" | "add" => Ok(Self::Credit),
            "debit" | "deduct" => Ok(Self::Debit),
            _ => Err(format!("Unknown adjustment direction: {s}")),
        }
    }
}

/// Immutable record of one balance-affecting event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Gateway transaction id for deposits.
    pub external_ref: Option<String>,
    /// Deposit request credited by this transaction.
    pub deposit_id: Option<DepositId>,
    /// Where the funds came from.
    pub source: Counterparty,
    /// Where the funds went.
    pub destination: Counterparty,
    /// Amount moved, always positive.
    pub amount: Decimal,
    /// Fee charged on top of the amount.
    pub fee: Decimal,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Event kind.
    pub kind: TransactionKind,
    /// Free-text description.
    pub description: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl LedgerTransaction {
    /// Returns true if `account_id` is on either side.
    #[must_use]
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.source.account_id() == Some(account_id)
            || self.destination.account_id() == Some(account_id)
    }

    /// Signed balance effect on `account_id`.
    #[must_use]
    pub fn net_effect_on(&self, account_id: AccountId) -> Decimal {
        let mut effect = Decimal::ZERO;
        if self.destination.account_id() == Some(account_id) {
            effect += self.amount;
        }
        if self.source.account_id() == Some(account_id) {
            effect -= self.amount + self.fee;
        }
        effect
    }
}

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// The transfer record.
    pub transaction: LedgerTransaction,
    /// Sender after the debit.
    pub source: Account,
    /// Recipient after the credit.
    pub destination: Account,
}

/// Result of a committed administrative adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentReceipt {
    /// The adjustment record.
    pub transaction: LedgerTransaction,
    /// Balance before the adjustment.
    pub previous_balance: Decimal,
    /// Target after the adjustment.
    pub account: Account,
}
