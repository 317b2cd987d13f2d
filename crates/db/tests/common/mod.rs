//! Shared setup for the repository integration tests.
//!
//! Every test gets its own in-memory SQLite database with the schema applied.
//! The pool holds a single connection so the database outlives each query.
//! Contention tests use a SQLite file instead, so several connections can
//! race on the same rows.

#![allow(dead_code)]

use remit_core::account::{Account, AdminAllowList, Profile};
use remit_core::ledger::{AdjustDirection, LedgerSettings};
use remit_db::migration::{Migrator, MigratorTrait};
use remit_db::{AccountRepository, DepositRepository, LedgerRepository, ReportRepository};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

pub const ADMIN: &str = "admin1";

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Opens a pool of `connections` over a new SQLite file in `dir`.
pub async fn setup_file_db(dir: &TempDir, connections: u32) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("remit.db").display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open database file");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Repositories wired to one database, as the server wires them.
pub struct Harness {
    pub db: DatabaseConnection,
    pub accounts: AccountRepository,
    pub ledger: LedgerRepository,
    pub deposits: DepositRepository,
    pub reports: ReportRepository,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(LedgerSettings::default()).await
    }

    pub async fn with_settings(settings: LedgerSettings) -> Self {
        Self::wire(setup_db().await, settings)
    }

    /// A harness over a multi-connection file database.
    ///
    /// Conflict retries are raised so that heavy contention still ends in a
    /// business outcome rather than `Conflict`.
    pub async fn pooled(dir: &TempDir, connections: u32) -> Self {
        let settings = LedgerSettings {
            max_conflict_retries: 50,
            ..LedgerSettings::default()
        };
        Self::wire(setup_file_db(dir, connections).await, settings)
    }

    fn wire(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone(), AdminAllowList::new([ADMIN])),
            ledger: LedgerRepository::new(db.clone(), settings.clone()),
            deposits: DepositRepository::new(db.clone(), settings),
            reports: ReportRepository::new(db.clone()),
            db,
        }
    }

    pub async fn account(&self, external_id: &str) -> Account {
        self.accounts
            .resolve_or_create(external_id, &Profile::with_username(external_id))
            .await
            .expect("Failed to create account")
    }

    /// Creates an account and credits it through an admin adjustment.
    pub async fn funded_account(&self, external_id: &str, balance: Decimal) -> Account {
        self.account(external_id).await;
        self.ledger
            .admin_adjust(external_id, balance, AdjustDirection::Credit, ADMIN, "seed")
            .await
            .expect("Failed to fund account")
            .account
    }

    pub async fn balance(&self, external_id: &str) -> Decimal {
        self.ledger
            .balance_of(external_id)
            .await
            .expect("Failed to read balance")
            .expect("Account should exist")
    }
}
