//! Ledger engine rules.
//!
//! This module holds everything about a balance mutation that can be decided
//! without storage:
//! - Transaction kinds, statuses and counterparties
//! - Fee arithmetic and engine settings
//! - Transfer, adjustment and credit planning
//! - Error types for ledger operations

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::LedgerError;
pub use service::{
    AccountSnapshot, AdjustmentPlan, BalanceChange, LedgerService, LedgerSettings, TransferPlan,
};
pub use types::{
    AdjustDirection, AdjustmentReceipt, Counterparty, LedgerTransaction, TransactionKind,
    TransactionStatus, TransferReceipt,
};
