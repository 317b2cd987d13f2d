//! Property-based tests for LedgerService.
//!
//! - Transfers conserve funds: the sum of balances drops by exactly the fee
//! - Fees are the rounded product of amount and rate
//! - Rejected transfers and debits never produce a plan

use proptest::prelude::*;
use remit_shared::types::AccountId;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::service::{AccountSnapshot, LedgerService, LedgerSettings};
use super::types::AdjustDirection;

/// Strategy to generate transfer amounts (0.01 to 10,000.00).
fn transfer_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate balances with full ledger precision (0 to 20,000).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..2_000_000_000_000i64).prop_map(|units| Decimal::new(units, 8))
}

/// Strategy to generate fee rates (0% to 5%).
fn fee_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=500i64).prop_map(|bps| Decimal::new(bps, 4))
}

fn snapshot(balance: Decimal) -> AccountSnapshot {
    AccountSnapshot {
        id: AccountId::new(),
        balance,
        version: 0,
    }
}

fn settings(fee_rate: Decimal) -> LedgerSettings {
    LedgerSettings {
        fee_rate,
        ..LedgerSettings::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_transfer_conserves_funds(
        source_balance in balance(),
        destination_balance in balance(),
        amount in transfer_amount(),
        rate in fee_rate(),
    ) {
        let settings = settings(rate);
        let source = snapshot(source_balance);
        let destination = snapshot(destination_balance);

        match LedgerService::plan_transfer(&source, &destination, amount, &settings) {
            Ok(plan) => {
                prop_assert_eq!(plan.total, amount + plan.fee);
                prop_assert_eq!(plan.source.after, source_balance - plan.total);
                prop_assert_eq!(plan.destination.after, destination_balance + amount);
                prop_assert!(plan.source.after >= Decimal::ZERO);

                let before = source_balance + destination_balance;
                let after = plan.source.after + plan.destination.after;
                prop_assert_eq!(before - after, plan.fee);
            }
            Err(LedgerError::InsufficientFunds { required, available }) => {
                prop_assert!(available < required);
                prop_assert_eq!(required, amount + settings.fee_for(amount));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn prop_fee_is_rounded_product(amount in transfer_amount(), rate in fee_rate()) {
        let fee = settings(rate).fee_for(amount);
        prop_assert!(fee >= Decimal::ZERO);
        prop_assert!(fee.scale() <= 8);
        prop_assert!((fee - amount * rate).abs() <= Decimal::new(5, 9));
    }

    #[test]
    fn prop_transfer_requires_total(amount in transfer_amount(), rate in fee_rate()) {
        let settings = settings(rate);
        let total = amount + settings.fee_for(amount);
        let destination = snapshot(Decimal::ZERO);

        let exact = LedgerService::plan_transfer(&snapshot(total), &destination, amount, &settings);
        prop_assert!(exact.is_ok());

        let short = total - Decimal::new(1, 8);
        let result =
            LedgerService::plan_transfer(&snapshot(short), &destination, amount, &settings);
        let is_insufficient = matches!(result, Err(LedgerError::InsufficientFunds { .. }));
        prop_assert!(is_insufficient);
    }

    #[test]
    fn prop_self_transfer_always_rejected(balance in balance(), amount in transfer_amount()) {
        let account = snapshot(balance);
        let settings = LedgerSettings::default();
        let result = LedgerService::plan_transfer(&account, &account, amount, &settings);
        prop_assert_eq!(result, Err(LedgerError::SelfTransfer));
    }

    #[test]
    fn prop_debit_never_goes_negative(balance in balance(), amount in transfer_amount()) {
        let target = snapshot(balance);
        match LedgerService::plan_adjustment(&target, amount, AdjustDirection::Debit) {
            Ok(plan) => {
                prop_assert!(amount <= balance);
                prop_assert_eq!(plan.change.after, balance - amount);
            }
            Err(err) => {
                prop_assert!(amount > balance);
                let is_insufficient = matches!(err, LedgerError::InsufficientFunds { .. });
                prop_assert!(is_insufficient);
            }
        }
    }

    #[test]
    fn prop_credit_always_succeeds(balance in balance(), amount in transfer_amount()) {
        let target = snapshot(balance);
        let plan = LedgerService::plan_adjustment(&target, amount, AdjustDirection::Credit);
        prop_assert_eq!(plan.map(|p| p.change.after), Ok(balance + amount));
    }
}
