//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every mutating operation runs as one database transaction and is re-run
//! from a fresh read when it loses a write conflict.

pub mod account;
pub mod deposit;
pub mod ledger;
pub mod report;

pub use account::AccountRepository;
pub use deposit::DepositRepository;
pub use ledger::LedgerRepository;
pub use report::ReportRepository;

use std::future::Future;
use std::time::Duration;

use remit_core::ledger::LedgerError;
use sea_orm::{DbErr, SqlErr};
use tracing::{error, warn};

/// Backend messages that mean "another writer got there first".
const CONFLICT_MARKERS: [&str; 4] = [
    "could not serialize",
    "deadlock detected",
    "database is locked",
    "database table is locked",
];

/// Maps a database error onto the ledger error space.
///
/// Serialization failures, deadlocks and SQLite lock contention become
/// `ConcurrentModification` so the unit is retried. Anything else is a
/// storage fault.
pub(crate) fn storage_error(err: DbErr) -> LedgerError {
    let message = err.to_string();
    if CONFLICT_MARKERS.iter().any(|marker| message.contains(marker)) {
        return LedgerError::ConcurrentModification;
    }

    error!(error = %message, "storage operation failed");
    LedgerError::StorageUnavailable(message)
}

/// Returns true if `err` is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Runs `unit` until it stops failing with a retryable error.
///
/// Each attempt must open its own database transaction so that it starts from
/// a fresh read. After `max_attempts` conflicting attempts the error becomes
/// `Conflict`.
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    operation: &'static str,
    max_attempts: u32,
    mut unit: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match unit().await {
            Err(err) if err.is_retryable() => {
                if attempt >= max_attempts {
                    warn!(operation, attempts = attempt, "giving up after write conflicts");
                    return Err(LedgerError::Conflict { attempts: attempt });
                }
                warn!(operation, attempt, "write conflict, retrying");
                tokio::time::sleep(Duration::from_millis(u64::from(attempt) * 5)).await;
            }
            result => return result,
        }
    }
}
