//! Ledger service for transfer and adjustment planning.
//!
//! This module decides, from a consistent snapshot of the accounts involved,
//! whether a balance mutation is allowed and what the balances become. It does
//! not touch storage: `remit-db` reads the snapshots inside a database
//! transaction, asks for a plan, then applies it with a version check.

use remit_shared::LedgerConfig;
use remit_shared::types::{AccountId, LEDGER_SCALE, to_minor_units};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::AdjustDirection;

/// Settings the engine runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Fraction of a transfer charged as fee.
    pub fee_rate: Decimal,
    /// Smallest transfer accepted.
    pub min_transfer_amount: Decimal,
    /// Attempts for one atomic unit before reporting a conflict.
    pub max_conflict_retries: u32,
}

impl LedgerSettings {
    /// Fee for a transfer of `amount`.
    ///
    /// Rounded to the ledger scale with Banker's Rounding (MidpointNearestEven).
    #[must_use]
    pub fn fee_for(&self, amount: Decimal) -> Decimal {
        (amount * self.fee_rate)
            .round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointNearestEven)
    }

    /// Attempts allowed for one atomic unit, at least one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_conflict_retries.max(1)
    }
}

impl From<&LedgerConfig> for LedgerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            fee_rate: config.fee_rate,
            min_transfer_amount: config.min_transfer_amount,
            max_conflict_retries: config.max_conflict_retries,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

/// Balance and version of an account as read inside the atomic unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// The account.
    pub id: AccountId,
    /// Balance at read time.
    pub balance: Decimal,
    /// Version at read time; the write must still see it.
    pub version: i64,
}

/// A planned write to one account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    /// The account to update.
    pub account_id: AccountId,
    /// Version the row must still have.
    pub expected_version: i64,
    /// Balance before the write.
    pub before: Decimal,
    /// Balance after the write.
    pub after: Decimal,
}

impl BalanceChange {
    fn new(snapshot: &AccountSnapshot, after: Decimal) -> Self {
        Self {
            account_id: snapshot.id,
            expected_version: snapshot.version,
            before: snapshot.balance,
            after,
        }
    }

    /// Signed change in balance.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.after - self.before
    }
}

/// A validated transfer, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    /// Amount received by the destination.
    pub amount: Decimal,
    /// Fee kept by the system.
    pub fee: Decimal,
    /// Amount taken from the source.
    pub total: Decimal,
    /// Debit of the source.
    pub source: BalanceChange,
    /// Credit of the destination.
    pub destination: BalanceChange,
}

impl TransferPlan {
    /// Both writes, ordered by account id so opposing transfers lock alike.
    #[must_use]
    pub fn changes_in_lock_order(&self) -> [BalanceChange; 2] {
        if self.source.account_id <= self.destination.account_id {
            [self.source, self.destination]
        } else {
            [self.destination, self.source]
        }
    }
}

/// A validated administrative adjustment, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentPlan {
    /// Amount added or removed.
    pub amount: Decimal,
    /// Credit or debit.
    pub direction: AdjustDirection,
    /// The write to the target.
    pub change: BalanceChange,
}

/// Ledger service for transfer and adjustment planning.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Checks that `amount` is positive and representable in the ledger.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for zero, negative or over-precise amounts.
    pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "{amount} must be greater than zero"
            )));
        }
        to_minor_units(amount)?;
        Ok(amount)
    }

    /// Checks a transfer amount, including the configured minimum.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the amount fails [`Self::validate_amount`]
    /// or is below `settings.min_transfer_amount`.
    pub fn validate_transfer_amount(
        amount: Decimal,
        settings: &LedgerSettings,
    ) -> Result<Decimal, LedgerError> {
        let amount = Self::validate_amount(amount)?;
        if amount < settings.min_transfer_amount {
            return Err(LedgerError::InvalidAmount(format!(
                "{amount} is below the minimum transfer of {}",
                settings.min_transfer_amount
            )));
        }
        Ok(amount)
    }

    /// Plans a transfer between two accounts.
    ///
    /// 1. Rejects self transfers
    /// 2. Computes the fee and the total debited from the source
    /// 3. Rejects the transfer if the source cannot cover the total
    ///
    /// # Errors
    ///
    /// Returns `SelfTransfer`, `InsufficientFunds` or `InvalidAmount`.
    pub fn plan_transfer(
        source: &AccountSnapshot,
        destination: &AccountSnapshot,
        amount: Decimal,
        settings: &LedgerSettings,
    ) -> Result<TransferPlan, LedgerError> {
        let amount = Self::validate_transfer_amount(amount, settings)?;

        if source.id == destination.id {
            return Err(LedgerError::SelfTransfer);
        }

        let fee = settings.fee_for(amount);
        let total = amount + fee;

        if source.balance < total {
            return Err(LedgerError::InsufficientFunds {
                required: total,
                available: source.balance,
            });
        }

        let destination_after = destination.balance + amount;
        to_minor_units(destination_after)?;

        Ok(TransferPlan {
            amount,
            fee,
            total,
            source: BalanceChange::new(source, source.balance - total),
            destination: BalanceChange::new(destination, destination_after),
        })
    }

    /// Plans an administrative credit or debit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, or `InsufficientFunds` for a debit larger than
    /// the balance.
    pub fn plan_adjustment(
        target: &AccountSnapshot,
        amount: Decimal,
        direction: AdjustDirection,
    ) -> Result<AdjustmentPlan, LedgerError> {
        let amount = Self::validate_amount(amount)?;

        let after = match direction {
            AdjustDirection::Credit => target.balance + amount,
            AdjustDirection::Debit => {
                if target.balance < amount {
                    return Err(LedgerError::InsufficientFunds {
                        required: amount,
                        available: target.balance,
                    });
                }
                target.balance - amount
            }
        };
        to_minor_units(after)?;

        Ok(AdjustmentPlan {
            amount,
            direction,
            change: BalanceChange::new(target, after),
        })
    }

    /// Plans a fee-free credit, as used for confirmed deposits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the amount or the resulting balance is not
    /// representable.
    pub fn plan_credit(
        target: &AccountSnapshot,
        amount: Decimal,
    ) -> Result<BalanceChange, LedgerError> {
        let amount = Self::validate_amount(amount)?;
        let after = target.balance + amount;
        to_minor_units(after)?;
        Ok(BalanceChange::new(target, after))
    }

    /// Description stored on administrative adjustments.
    #[must_use]
    pub fn audit_description(description: &str, actor: &str) -> String {
        let description = description.trim();
        if description.is_empty() {
            format!("Adjustment (by admin: {actor})")
        } else {
            format!("{description} (by admin: {actor})")
        }
    }
}
