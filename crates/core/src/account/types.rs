//! Account domain types.

use chrono::{DateTime, Utc};
use remit_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::number::AccountNumber;
use crate::ledger::AccountSnapshot;

/// Display fields supplied by the messaging platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Platform handle.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

impl Profile {
    /// Profile with only a handle set.
    #[must_use]
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }
}

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal row identifier.
    pub id: AccountId,
    /// Identity on the messaging platform.
    pub external_id: String,
    /// Public account number used as a transfer destination.
    pub account_number: AccountNumber,
    /// Platform handle.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Current balance, never negative.
    pub balance: Decimal,
    /// Whether the account was created for an allow-listed identity.
    pub is_admin: bool,
    /// Compare-and-swap counter, bumped on every balance write.
    pub version: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last time the owner interacted with the system.
    pub last_activity_at: DateTime<Utc>,
}

impl Account {
    /// Best human-readable name: `@username`, then full name, then external id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            return format!("@{username}");
        }

        let full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        if full_name.is_empty() {
            self.external_id.clone()
        } else {
            full_name
        }
    }

    /// Balance and version as read for a ledger plan.
    #[must_use]
    pub const fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            balance: self.balance,
            version: self.version,
        }
    }
}
