//! Report data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of transactions returned by a history query when none is asked for.
pub const DEFAULT_HISTORY_LIMIT: u64 = 10;

/// Upper bound on a single history query.
pub const MAX_HISTORY_LIMIT: u64 = 100;

/// System-wide aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Number of accounts.
    pub total_accounts: u64,
    /// Sum of all balances.
    pub total_balance: Decimal,
    /// Number of ledger transactions.
    pub total_transactions: u64,
    /// Deposit requests still waiting for the gateway.
    pub pending_deposits: u64,
}
