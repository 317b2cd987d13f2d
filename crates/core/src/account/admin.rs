//! Administrative allow-list.

use std::collections::HashSet;

use remit_shared::{AdminConfig, AppError, AppResult};

/// External identities allowed to perform administrative operations.
///
/// Consulted when an account is first created and by the command layer before
/// an adjustment reaches the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    ids: HashSet<String>,
}

impl AdminAllowList {
    /// Creates an allow-list from raw identities.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the allow-list from configuration.
    #[must_use]
    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.ids.iter().cloned())
    }

    /// Returns true if `external_id` is privileged.
    #[must_use]
    pub fn contains(&self, external_id: &str) -> bool {
        self.ids.contains(external_id)
    }

    /// Checks that `actor` may run administrative operations.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the actor is not on the list.
    pub fn authorize(&self, actor: &str) -> AppResult<()> {
        if self.contains(actor) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{actor} is not an administrator")))
        }
    }

    /// Number of privileged identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nobody is privileged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = AdminConfig {
            ids: vec!["1001".to_string(), "1002".to_string()],
        };
        let admins = AdminAllowList::from_config(&config);
        assert_eq!(admins.len(), 2);
        assert!(admins.contains("1001"));
        assert!(!admins.contains("1003"));
    }

    #[test]
    fn test_authorize() {
        let admins = AdminAllowList::new(["admin1"]);
        assert!(admins.authorize("admin1").is_ok());

        let err = admins.authorize("mallory").unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_empty_list_denies_everyone() {
        let admins = AdminAllowList::default();
        assert!(admins.is_empty());
        assert!(admins.authorize("anyone").is_err());
    }
}
