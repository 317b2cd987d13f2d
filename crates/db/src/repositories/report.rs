//! Report repository for the read-only query surface.
//!
//! Reads run outside the mutating units and may observe a state that a
//! concurrent transfer is about to replace.

use remit_core::account::Account;
use remit_core::ledger::LedgerTransaction;
use remit_core::reports::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, SystemStats};
use remit_shared::types::{AccountId, PageRequest, PageResponse, from_minor_units};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::entities::{accounts, deposit_requests, ledger_transactions, sea_orm_active_enums as db};

/// Report repository for listings, history and totals.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns a database error if the connection is gone.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.db.ping().await
    }

    /// One page of accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list_accounts(
        &self,
        request: PageRequest,
    ) -> Result<PageResponse<Account>, DbErr> {
        let request = request.normalized();

        let total = accounts::Entity::find().count(&self.db).await?;
        let rows = accounts::Entity::find()
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id)
            .offset(request.offset())
            .limit(request.limit())
            .all(&self.db)
            .await?;

        let data = rows.into_iter().map(Account::from).collect();
        Ok(PageResponse::new(data, request, total))
    }

    /// Most recent transactions touching `account_id`, newest first.
    ///
    /// `limit` defaults to 10 and is capped at 100.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn history(
        &self,
        account_id: AccountId,
        limit: Option<u64>,
    ) -> Result<Vec<LedgerTransaction>, DbErr> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let id = account_id.into_inner();

        let rows = ledger_transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(ledger_transactions::Column::SourceAccountId.eq(id))
                    .add(ledger_transactions::Column::DestinationAccountId.eq(id)),
            )
            .order_by_desc(ledger_transactions::Column::CreatedAt)
            .order_by_desc(ledger_transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(LedgerTransaction::from).collect())
    }

    /// System-wide totals.
    ///
    /// # Errors
    ///
    /// Returns a database error if any of the queries fails.
    pub async fn system_stats(&self) -> Result<SystemStats, DbErr> {
        let total_accounts = accounts::Entity::find().count(&self.db).await?;
        let total_transactions = ledger_transactions::Entity::find().count(&self.db).await?;
        let pending_deposits = deposit_requests::Entity::find()
            .filter(deposit_requests::Column::Status.eq(db::DepositStatus::Pending))
            .count(&self.db)
            .await?;

        let balance_units: Option<i64> = accounts::Entity::find()
            .select_only()
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(balance_units), 0) AS BIGINT)"),
                "total_balance",
            )
            .into_tuple()
            .one(&self.db)
            .await?;

        Ok(SystemStats {
            total_accounts,
            total_balance: from_minor_units(balance_units.unwrap_or(0)),
            total_transactions,
            pending_deposits,
        })
    }
}
