//! Account repository: the identity-to-account directory.
//!
//! Accounts are created on first contact and never deleted. Balance columns are
//! only written by the ledger repository.

use chrono::Utc;
use remit_core::account::{Account, AccountNumber, AdminAllowList, Profile};
use remit_core::ledger::LedgerError;
use remit_shared::types::AccountId;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use tracing::{info, warn};

use super::{is_unique_violation, storage_error};
use crate::entities::accounts;
use crate::mapping::now;

/// How many fresh account numbers are tried before giving up.
const ACCOUNT_NUMBER_ATTEMPTS: usize = 3;

/// Finds an account row by external identity.
pub(crate) async fn find_by_external_id<C: ConnectionTrait>(
    conn: &C,
    external_id: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::ExternalId.eq(external_id))
        .one(conn)
        .await
}

/// Finds an account row by account number (any case) or external identity.
pub(crate) async fn find_by_token<C: ConnectionTrait>(
    conn: &C,
    token: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    if let Some(number) = AccountNumber::parse(token) {
        let by_number = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(number.as_str()))
            .one(conn)
            .await?;
        if by_number.is_some() {
            return Ok(by_number);
        }
    }

    find_by_external_id(conn, token).await
}

/// Account repository for directory operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    admins: AdminAllowList,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, admins: AdminAllowList) -> Self {
        Self { db, admins }
    }

    /// The allow-list new accounts are checked against.
    #[must_use]
    pub const fn admins(&self) -> &AdminAllowList {
        &self.admins
    }

    /// Returns the account for `external_id`, creating it on first contact.
    ///
    /// An existing account gets its profile fields and last activity refreshed.
    /// A new account gets a fresh account number, a zero balance, and the admin
    /// flag if the identity is on the allow-list. When two first contacts race,
    /// the loser returns the winner's account.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn resolve_or_create(
        &self,
        external_id: &str,
        profile: &Profile,
    ) -> Result<Account, LedgerError> {
        if let Some(existing) = find_by_external_id(&self.db, external_id)
            .await
            .map_err(storage_error)?
        {
            return self.refresh_profile(existing, profile).await;
        }

        for attempt in 1..=ACCOUNT_NUMBER_ATTEMPTS {
            let number = AccountNumber::generate(external_id);
            match self.insert_account(external_id, &number, profile).await {
                Ok(model) => {
                    info!(
                        account_id = %model.id,
                        account_number = %model.account_number,
                        is_admin = model.is_admin,
                        "account created"
                    );
                    return Ok(model.into());
                }
                Err(err) if is_unique_violation(&err) => {
                    // Either another first contact won the race, or the number collided.
                    if let Some(winner) = find_by_external_id(&self.db, external_id)
                        .await
                        .map_err(storage_error)?
                    {
                        return Ok(winner.into());
                    }
                    warn!(attempt, "account number collision, regenerating");
                }
                Err(err) => return Err(storage_error(err)),
            }
        }

        Err(LedgerError::StorageUnavailable(
            "could not allocate a unique account number".to_string(),
        ))
    }

    async fn insert_account(
        &self,
        external_id: &str,
        number: &AccountNumber,
        profile: &Profile,
    ) -> Result<accounts::Model, DbErr> {
        let now = now();
        accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            external_id: Set(external_id.to_string()),
            account_number: Set(number.as_str().to_string()),
            username: Set(profile.username.clone()),
            first_name: Set(profile.first_name.clone()),
            last_name: Set(profile.last_name.clone()),
            balance_units: Set(0),
            version: Set(0),
            is_admin: Set(self.admins.contains(external_id)),
            created_at: Set(now),
            last_activity_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    async fn refresh_profile(
        &self,
        existing: accounts::Model,
        profile: &Profile,
    ) -> Result<Account, LedgerError> {
        let now = now();
        accounts::Entity::update_many()
            .col_expr(accounts::Column::Username, Expr::value(profile.username.clone()))
            .col_expr(accounts::Column::FirstName, Expr::value(profile.first_name.clone()))
            .col_expr(accounts::Column::LastName, Expr::value(profile.last_name.clone()))
            .col_expr(accounts::Column::LastActivityAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(existing.id))
            .exec(&self.db)
            .await
            .map_err(storage_error)?;

        let mut account: Account = existing.into();
        account.username.clone_from(&profile.username);
        account.first_name.clone_from(&profile.first_name);
        account.last_name.clone_from(&profile.last_name);
        account.last_activity_at = now.with_timezone(&Utc);
        Ok(account)
    }

    /// Finds an account by account number or external identity.
    ///
    /// Account numbers match in any letter case.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Account>, LedgerError> {
        Ok(find_by_token(&self.db, token)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    /// Finds an account by external identity.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Account>, LedgerError> {
        Ok(find_by_external_id(&self.db, external_id)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    /// Finds an account by internal ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    /// Refreshes `last_activity_at` only.
    ///
    /// Returns false if no account exists for `external_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database fails.
    pub async fn touch_activity(&self, external_id: &str) -> Result<bool, LedgerError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::LastActivityAt, Expr::value(now()))
            .filter(accounts::Column::ExternalId.eq(external_id))
            .exec(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected > 0)
    }
}
