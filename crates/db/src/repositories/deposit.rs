//! Deposit repository: funding requests and their exactly-once credit.
//!
//! A confirmation moves the request to `completed`, credits the owner and
//! records a `deposit` transaction in one database transaction. The unique
//! indexes on `ledger_transactions.deposit_id` and `external_ref` back up the
//! status check, so a duplicate delivery can never credit twice.

use chrono::{TimeDelta, Utc};
use remit_core::account::Account;
use remit_core::deposit::{
    DepositConfirmation, DepositRequest, DepositStatus, FundingRequest, GatewayStatus,
    GatewayUpdate, PaymentGateway,
};
use remit_core::ledger::{
    Counterparty, LedgerError, LedgerService, LedgerSettings, TransactionKind,
};
use remit_shared::types::{AccountId, Currency, DepositId, to_minor_units};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, error, info, warn};

use super::ledger::{NewTransaction, applied, apply_balance_change, insert_transaction};
use super::{is_unique_violation, storage_error, with_conflict_retry};
use crate::entities::{accounts, deposit_requests, sea_orm_active_enums as db};
use crate::mapping::now;

/// Statuses a confirmation or failure may still move away from.
const OPEN_STATUSES: [db::DepositStatus; 2] =
    [db::DepositStatus::Pending, db::DepositStatus::Confirmed];

async fn find_by_txn_id<C: ConnectionTrait>(
    conn: &C,
    gateway_txn_id: &str,
) -> Result<Option<deposit_requests::Model>, DbErr> {
    deposit_requests::Entity::find()
        .filter(deposit_requests::Column::GatewayTxnId.eq(gateway_txn_id))
        .one(conn)
        .await
}

/// Deposit repository for gateway-funded credits.
#[derive(Debug, Clone)]
pub struct DepositRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl DepositRepository {
    /// Creates a new deposit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Opens a deposit request and asks `gateway` to fund it.
    ///
    /// The request is stored `pending` before the gateway is called. If the
    /// gateway fails, the request is marked `failed` and the gateway error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid
    /// - The account does not exist
    /// - The gateway rejects the request or cannot be reached
    /// - Storage fails
    pub async fn request_deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        currency: Currency,
        gateway: &dyn PaymentGateway,
    ) -> Result<DepositRequest, LedgerError> {
        let amount = LedgerService::validate_amount(amount)?;

        let owner: Account = accounts::Entity::find_by_id(account_id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::TargetNotFound(account_id.to_string()))?
            .into();

        let deposit_id = DepositId::new();
        let requested_at = now();
        let pending = deposit_requests::ActiveModel {
            id: Set(deposit_id.into_inner()),
            gateway_txn_id: Set(None),
            account_id: Set(owner.id.into_inner()),
            amount_units: Set(to_minor_units(amount)?),
            currency: Set(currency.into()),
            address: Set(None),
            checkout_url: Set(None),
            status: Set(db::DepositStatus::Pending),
            created_at: Set(requested_at),
            expires_at: Set(None),
            confirmed_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(storage_error)?;

        let request = FundingRequest {
            deposit_id,
            amount,
            currency,
            buyer_reference: owner.external_id.clone(),
        };

        let instrument = match gateway.create_funding(&request).await {
            Ok(instrument) => instrument,
            Err(err) => {
                warn!(deposit_id = %deposit_id, error = %err, "gateway refused funding request");
                let mut failed: deposit_requests::ActiveModel = pending.into();
                failed.status = Set(db::DepositStatus::Failed);
                failed.update(&self.db).await.map_err(storage_error)?;
                return Err(err.into());
            }
        };

        let expires_at = TimeDelta::from_std(instrument.timeout)
            .ok()
            .and_then(|ttl| requested_at.checked_add_signed(ttl));

        let mut funded: deposit_requests::ActiveModel = pending.into();
        funded.gateway_txn_id = Set(Some(instrument.gateway_txn_id.clone()));
        funded.address = Set(Some(instrument.address));
        funded.checkout_url = Set(instrument.checkout_url);
        funded.expires_at = Set(expires_at);
        let funded = funded.update(&self.db).await.map_err(|err| {
            // The gateway already issued the instrument; its notifications
            // will not find this request until it is linked by hand.
            error!(
                deposit_id = %deposit_id,
                gateway_txn_id = %instrument.gateway_txn_id,
                error = %err,
                "funding instrument issued but not recorded"
            );
            storage_error(err)
        })?;

        info!(
            deposit_id = %deposit_id,
            account = %owner.account_number,
            amount = %amount,
            currency = %currency,
            "deposit requested"
        );
        Ok(funded.into())
    }

    /// Credits the deposit for `gateway_txn_id` exactly once.
    ///
    /// A repeated confirmation returns `AlreadyProcessed` as a success value.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No request has this gateway transaction id
    /// - The request already failed
    /// - The unit kept conflicting, or storage failed
    pub async fn confirm(&self, gateway_txn_id: &str) -> Result<DepositConfirmation, LedgerError> {
        let result = with_conflict_retry("confirm_deposit", self.settings.max_attempts(), || {
            self.confirm_once(gateway_txn_id)
        })
        .await;

        match result {
            Ok(confirmation) => Ok(confirmation),
            Err(LedgerError::AlreadyProcessed(_)) => {
                debug!(gateway_txn_id, "duplicate deposit confirmation");
                Ok(DepositConfirmation::AlreadyProcessed {
                    gateway_txn_id: gateway_txn_id.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn confirm_once(&self, gateway_txn_id: &str) -> Result<DepositConfirmation, LedgerError> {
        let txn = self.db.begin().await.map_err(storage_error)?;

        let deposit = find_by_txn_id(&txn, gateway_txn_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::UnknownDeposit(gateway_txn_id.to_string()))?;

        let status = DepositStatus::from(deposit.status);
        if !status.can_confirm() {
            return Err(if status == DepositStatus::Completed {
                LedgerError::AlreadyProcessed(gateway_txn_id.to_string())
            } else {
                LedgerError::DepositNotConfirmable(gateway_txn_id.to_string())
            });
        }

        let now = now();
        let claimed = deposit_requests::Entity::update_many()
            .col_expr(
                deposit_requests::Column::Status,
                Expr::value(db::DepositStatus::Completed),
            )
            .col_expr(deposit_requests::Column::ConfirmedAt, Expr::value(Some(now)))
            .filter(deposit_requests::Column::Id.eq(deposit.id))
            .filter(deposit_requests::Column::Status.is_in(OPEN_STATUSES))
            .exec(&txn)
            .await
            .map_err(storage_error)?;
        if claimed.rows_affected == 0 {
            return Err(LedgerError::ConcurrentModification);
        }

        let owner: Account = accounts::Entity::find_by_id(deposit.account_id)
            .one(&txn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::TargetNotFound(deposit.account_id.to_string()))?
            .into();

        let mut request = DepositRequest::from(deposit);
        let change = LedgerService::plan_credit(&owner.snapshot(), request.amount)?;
        apply_balance_change(&txn, &change).await?;

        let record = insert_transaction(
            &txn,
            NewTransaction {
                kind: TransactionKind::Deposit,
                source: Counterparty::System,
                destination: Counterparty::Account(owner.id),
                amount: request.amount,
                fee: Decimal::ZERO,
                description: Some(format!("Deposit {} {}", request.amount, request.currency)),
                external_ref: Some(gateway_txn_id),
                deposit_id: Some(request.id),
            },
            now,
        )
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                LedgerError::AlreadyProcessed(gateway_txn_id.to_string())
            } else {
                storage_error(err)
            }
        })?;

        txn.commit().await.map_err(storage_error)?;

        request.status = DepositStatus::Completed;
        request.confirmed_at = Some(now.with_timezone(&Utc));

        info!(
            deposit_id = %request.id,
            gateway_txn_id,
            account = %owner.account_number,
            amount = %request.amount,
            "deposit credited"
        );

        Ok(DepositConfirmation::Credited {
            deposit: request,
            transaction: record.into(),
            account: applied(owner, &change),
        })
    }

    /// Marks the request for `gateway_txn_id` as failed.
    ///
    /// A request that is already failed is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDeposit` if no request matches, or `AlreadyProcessed`
    /// if it was already credited.
    pub async fn mark_failed(&self, gateway_txn_id: &str) -> Result<DepositRequest, LedgerError> {
        with_conflict_retry("fail_deposit", self.settings.max_attempts(), || {
            self.mark_failed_once(gateway_txn_id)
        })
        .await
    }

    async fn mark_failed_once(&self, gateway_txn_id: &str) -> Result<DepositRequest, LedgerError> {
        let deposit = find_by_txn_id(&self.db, gateway_txn_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::UnknownDeposit(gateway_txn_id.to_string()))?;

        let mut request = DepositRequest::from(deposit);
        if request.status.is_terminal() {
            if request.status == DepositStatus::Completed {
                return Err(LedgerError::AlreadyProcessed(gateway_txn_id.to_string()));
            }
            return Ok(request);
        }

        let result = deposit_requests::Entity::update_many()
            .col_expr(
                deposit_requests::Column::Status,
                Expr::value(db::DepositStatus::Failed),
            )
            .filter(deposit_requests::Column::Id.eq(request.id.into_inner()))
            .filter(deposit_requests::Column::Status.is_in(OPEN_STATUSES))
            .exec(&self.db)
            .await
            .map_err(storage_error)?;
        if result.rows_affected == 0 {
            return Err(LedgerError::ConcurrentModification);
        }

        info!(deposit_id = %request.id, gateway_txn_id, "deposit failed");
        request.status = DepositStatus::Failed;
        Ok(request)
    }

    /// Applies a verified gateway status to the matching request.
    ///
    /// # Errors
    ///
    /// Returns the error of the dispatched operation.
    pub async fn apply_gateway_status(
        &self,
        gateway_txn_id: &str,
        status: GatewayStatus,
    ) -> Result<GatewayUpdate, LedgerError> {
        match status {
            GatewayStatus::Complete => self
                .confirm(gateway_txn_id)
                .await
                .map(GatewayUpdate::Confirmed),
            GatewayStatus::Failed => self
                .mark_failed(gateway_txn_id)
                .await
                .map(GatewayUpdate::Failed),
            GatewayStatus::Pending => self
                .find_by_gateway_txn_id(gateway_txn_id)
                .await?
                .map(GatewayUpdate::Pending)
                .ok_or_else(|| LedgerError::UnknownDeposit(gateway_txn_id.to_string())),
        }
    }

    /// Finds a request by gateway transaction id.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn find_by_gateway_txn_id(
        &self,
        gateway_txn_id: &str,
    ) -> Result<Option<DepositRequest>, LedgerError> {
        Ok(find_by_txn_id(&self.db, gateway_txn_id)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    /// Open requests of an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn pending_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<DepositRequest>, LedgerError> {
        let rows = deposit_requests::Entity::find()
            .filter(deposit_requests::Column::AccountId.eq(account_id.into_inner()))
            .filter(deposit_requests::Column::Status.is_in(OPEN_STATUSES))
            .order_by_desc(deposit_requests::Column::CreatedAt)
            .order_by_desc(deposit_requests::Column::Id)
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
