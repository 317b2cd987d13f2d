//! Ledger repository: the only writer of balances and transaction records.
//!
//! Each operation opens a database transaction, reads the accounts involved,
//! asks `LedgerService` for a plan, compare-and-swaps every touched account on
//! its version (lowest account id first), inserts the transaction record and
//! commits. A lost compare-and-swap re-runs the whole unit from a fresh read.

use remit_core::account::Account;
use remit_core::ledger::{
    AdjustDirection, AdjustmentReceipt, BalanceChange, Counterparty, LedgerError, LedgerService,
    LedgerSettings, TransactionKind, TransferReceipt,
};
use remit_shared::types::{AccountId, DepositId, TransactionId, to_minor_units};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::{account, storage_error, with_conflict_retry};
use crate::entities::{accounts, ledger_transactions, sea_orm_active_enums as db};
use crate::mapping::now;

/// Writes one planned balance change, guarded by the account version.
///
/// # Errors
///
/// Returns `ConcurrentModification` if the row moved on since it was read.
pub(crate) async fn apply_balance_change<C: ConnectionTrait>(
    conn: &C,
    change: &BalanceChange,
) -> Result<(), LedgerError> {
    let units = to_minor_units(change.after)?;

    let result = accounts::Entity::update_many()
        .col_expr(accounts::Column::BalanceUnits, Expr::value(units))
        .col_expr(
            accounts::Column::Version,
            Expr::value(change.expected_version + 1),
        )
        .filter(accounts::Column::Id.eq(change.account_id.into_inner()))
        .filter(accounts::Column::Version.eq(change.expected_version))
        .exec(conn)
        .await
        .map_err(storage_error)?;

    if result.rows_affected == 0 {
        return Err(LedgerError::ConcurrentModification);
    }
    Ok(())
}

/// Returns the account as it reads after `change` has been applied.
pub(crate) fn applied(mut account: Account, change: &BalanceChange) -> Account {
    account.balance = change.after;
    account.version = change.expected_version + 1;
    account
}

/// A completed transaction record about to be inserted.
pub(crate) struct NewTransaction<'a> {
    pub kind: TransactionKind,
    pub source: Counterparty,
    pub destination: Counterparty,
    pub amount: Decimal,
    pub fee: Decimal,
    pub description: Option<String>,
    pub external_ref: Option<&'a str>,
    pub deposit_id: Option<DepositId>,
}

/// Inserts a transaction record as completed, stamped `now`.
///
/// # Errors
///
/// Returns the raw database error so callers can recognise unique violations.
pub(crate) async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    record: NewTransaction<'_>,
    now: DateTimeWithTimeZone,
) -> Result<ledger_transactions::Model, DbErr> {
    let amount_units = to_minor_units(record.amount).map_err(|e| DbErr::Custom(e.to_string()))?;
    let fee_units = to_minor_units(record.fee).map_err(|e| DbErr::Custom(e.to_string()))?;

    ledger_transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        external_ref: Set(record.external_ref.map(str::to_string)),
        deposit_id: Set(record.deposit_id.map(DepositId::into_inner)),
        source_account_id: Set(record.source.account_id().map(AccountId::into_inner)),
        destination_account_id: Set(record.destination.account_id().map(AccountId::into_inner)),
        amount_units: Set(amount_units),
        fee_units: Set(fee_units),
        status: Set(db::TransactionStatus::Completed),
        kind: Set(record.kind.into()),
        description: Set(record.description),
        created_at: Set(now),
        completed_at: Set(Some(now)),
    }
    .insert(conn)
    .await
}

/// Ledger repository for transfers and administrative adjustments.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Settings the engine runs with.
    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Transfers `amount` from the account of `source_identity` to the account
    /// named by `destination_token`, charging the configured fee to the source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid or below the minimum
    /// - Either account cannot be resolved
    /// - Source and destination are the same account
    /// - The source cannot cover amount plus fee
    /// - The unit kept conflicting, or storage failed
    pub async fn transfer(
        &self,
        source_identity: &str,
        destination_token: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        let amount = LedgerService::validate_transfer_amount(amount, &self.settings)?;

        let result = with_conflict_retry("transfer", self.settings.max_attempts(), || {
            self.transfer_once(source_identity, destination_token, amount, description)
        })
        .await;

        match &result {
            Ok(receipt) => info!(
                transaction_id = %receipt.transaction.id,
                source = %receipt.source.account_number,
                destination = %receipt.destination.account_number,
                amount = %receipt.transaction.amount,
                fee = %receipt.transaction.fee,
                "transfer committed"
            ),
            Err(err) => debug!(error = %err, source = source_identity, "transfer rejected"),
        }
        result
    }

    async fn transfer_once(
        &self,
        source_identity: &str,
        destination_token: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        let txn = self.db.begin().await.map_err(storage_error)?;

        let source: Account = account::find_by_external_id(&txn, source_identity)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::SourceNotFound(source_identity.to_string()))?
            .into();
        let destination: Account = account::find_by_token(&txn, destination_token)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::DestinationNotFound(destination_token.to_string()))?
            .into();

        let plan = LedgerService::plan_transfer(
            &source.snapshot(),
            &destination.snapshot(),
            amount,
            &self.settings,
        )?;

        for change in plan.changes_in_lock_order() {
            apply_balance_change(&txn, &change).await?;
        }

        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Transfer to {}", destination.account_number));
        let record = insert_transaction(
            &txn,
            NewTransaction {
                kind: TransactionKind::Transfer,
                source: Counterparty::Account(source.id),
                destination: Counterparty::Account(destination.id),
                amount: plan.amount,
                fee: plan.fee,
                description: Some(description),
                external_ref: None,
                deposit_id: None,
            },
            now(),
        )
        .await
        .map_err(storage_error)?;

        txn.commit().await.map_err(storage_error)?;

        Ok(TransferReceipt {
            transaction: record.into(),
            source: applied(source, &plan.source),
            destination: applied(destination, &plan.destination),
        })
    }

    /// Credits or debits the account named by `target` on behalf of `actor`.
    ///
    /// The stored description names the acting administrator. Authorization is
    /// the caller's job, see `AdminAllowList::authorize`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid
    /// - The target cannot be resolved
    /// - A debit exceeds the balance
    /// - The unit kept conflicting, or storage failed
    pub async fn admin_adjust(
        &self,
        target: &str,
        amount: Decimal,
        direction: AdjustDirection,
        actor: &str,
        description: &str,
    ) -> Result<AdjustmentReceipt, LedgerError> {
        let amount = LedgerService::validate_amount(amount)?;
        let description = LedgerService::audit_description(description, actor);
        let description = description.as_str();

        let result = with_conflict_retry("admin_adjust", self.settings.max_attempts(), || {
            self.admin_adjust_once(target, amount, direction, description)
        })
        .await;

        match &result {
            Ok(receipt) => info!(
                transaction_id = %receipt.transaction.id,
                account = %receipt.account.account_number,
                kind = %receipt.transaction.kind,
                amount = %receipt.transaction.amount,
                actor,
                "adjustment committed"
            ),
            Err(err) => debug!(error = %err, target, actor, "adjustment rejected"),
        }
        result
    }

    async fn admin_adjust_once(
        &self,
        target: &str,
        amount: Decimal,
        direction: AdjustDirection,
        description: &str,
    ) -> Result<AdjustmentReceipt, LedgerError> {
        let txn = self.db.begin().await.map_err(storage_error)?;

        let account: Account = account::find_by_token(&txn, target)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::TargetNotFound(target.to_string()))?
            .into();

        let plan = LedgerService::plan_adjustment(&account.snapshot(), amount, direction)?;
        apply_balance_change(&txn, &plan.change).await?;

        let (source, destination) = match direction {
            AdjustDirection::Credit => (Counterparty::System, Counterparty::Account(account.id)),
            AdjustDirection::Debit => (Counterparty::Account(account.id), Counterparty::System),
        };
        let record = insert_transaction(
            &txn,
            NewTransaction {
                kind: direction.kind(),
                source,
                destination,
                amount: plan.amount,
                fee: Decimal::ZERO,
                description: Some(description.to_string()),
                external_ref: None,
                deposit_id: None,
            },
            now(),
        )
        .await
        .map_err(storage_error)?;

        txn.commit().await.map_err(storage_error)?;

        Ok(AdjustmentReceipt {
            transaction: record.into(),
            previous_balance: plan.change.before,
            account: applied(account, &plan.change),
        })
    }

    /// Balance of the account for `external_id`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn balance_of(&self, external_id: &str) -> Result<Option<Decimal>, LedgerError> {
        Ok(account::find_by_external_id(&self.db, external_id)
            .await
            .map_err(storage_error)?
            .map(|model| Account::from(model).balance))
    }
}
