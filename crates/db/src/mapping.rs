//! Conversions between stored rows and domain types.
//!
//! Rows keep money as ledger minor units; the domain sees `Decimal`.

use chrono::{DateTime, Utc};
use remit_core::account::{Account, AccountNumber};
use remit_core::deposit::{DepositRequest, DepositStatus};
use remit_core::ledger::{Counterparty, LedgerTransaction, TransactionKind, TransactionStatus};
use remit_shared::types::{AccountId, Currency, DepositId, TransactionId, from_minor_units};
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{accounts, deposit_requests, ledger_transactions, sea_orm_active_enums as db};

/// Current time in the column type used by every timestamp.
pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            external_id: model.external_id,
            account_number: AccountNumber::from_stored(model.account_number),
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            balance: from_minor_units(model.balance_units),
            is_admin: model.is_admin,
            version: model.version,
            created_at: utc(model.created_at),
            last_activity_at: utc(model.last_activity_at),
        }
    }
}

impl From<ledger_transactions::Model> for LedgerTransaction {
    fn from(model: ledger_transactions::Model) -> Self {
        Self {
            id: TransactionId::from_uuid(model.id),
            external_ref: model.external_ref,
            deposit_id: model.deposit_id.map(DepositId::from_uuid),
            source: Counterparty::from_account(model.source_account_id.map(AccountId::from_uuid)),
            destination: Counterparty::from_account(
                model.destination_account_id.map(AccountId::from_uuid),
            ),
            amount: from_minor_units(model.amount_units),
            fee: from_minor_units(model.fee_units),
            status: model.status.into(),
            kind: model.kind.into(),
            description: model.description,
            created_at: utc(model.created_at),
            completed_at: model.completed_at.map(utc),
        }
    }
}

impl From<deposit_requests::Model> for DepositRequest {
    fn from(model: deposit_requests::Model) -> Self {
        Self {
            id: DepositId::from_uuid(model.id),
            gateway_txn_id: model.gateway_txn_id,
            account_id: AccountId::from_uuid(model.account_id),
            amount: from_minor_units(model.amount_units),
            currency: model.currency.into(),
            address: model.address,
            checkout_url: model.checkout_url,
            status: model.status.into(),
            created_at: utc(model.created_at),
            expires_at: model.expires_at.map(utc),
            confirmed_at: model.confirmed_at.map(utc),
        }
    }
}

impl From<db::TransactionKind> for TransactionKind {
    fn from(kind: db::TransactionKind) -> Self {
        match kind {
            db::TransactionKind::Transfer => Self::Transfer,
            db::TransactionKind::Deposit => Self::Deposit,
            db::TransactionKind::Withdrawal => Self::Withdrawal,
            db::TransactionKind::AdminCredit => Self::AdminCredit,
            db::TransactionKind::AdminDebit => Self::AdminDebit,
        }
    }
}

impl From<TransactionKind> for db::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Transfer => Self::Transfer,
            TransactionKind::Deposit => Self::Deposit,
            TransactionKind::Withdrawal => Self::Withdrawal,
            TransactionKind::AdminCredit => Self::AdminCredit,
            TransactionKind::AdminDebit => Self::AdminDebit,
        }
    }
}

impl From<db::TransactionStatus> for TransactionStatus {
    fn from(status: db::TransactionStatus) -> Self {
        match status {
            db::TransactionStatus::Pending => Self::Pending,
            db::TransactionStatus::Completed => Self::Completed,
            db::TransactionStatus::Failed => Self::Failed,
            db::TransactionStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<db::DepositStatus> for DepositStatus {
    fn from(status: db::DepositStatus) -> Self {
        match status {
            db::DepositStatus::Pending => Self::Pending,
            db::DepositStatus::Confirmed => Self::Confirmed,
            db::DepositStatus::Completed => Self::Completed,
            db::DepositStatus::Failed => Self::Failed,
        }
    }
}

impl From<db::DepositCurrency> for Currency {
    fn from(currency: db::DepositCurrency) -> Self {
        match currency {
            db::DepositCurrency::Btc => Self::Btc,
            db::DepositCurrency::Eth => Self::Eth,
            db::DepositCurrency::Ltc => Self::Ltc,
            db::DepositCurrency::Usdt => Self::Usdt,
        }
    }
}

impl From<Currency> for db::DepositCurrency {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Btc => Self::Btc,
            Currency::Eth => Self::Eth,
            Currency::Ltc => Self::Ltc,
            Currency::Usdt => Self::Usdt,
        }
    }
}
