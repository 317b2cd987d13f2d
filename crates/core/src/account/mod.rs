//! Account directory rules.
//!
//! Account numbers are generated once at creation and never change. The admin
//! allow-list is plain configuration handed to whoever needs it.

pub mod admin;
pub mod number;
pub mod types;

pub use admin::AdminAllowList;
pub use number::{ACCOUNT_NUMBER_LEN, ACCOUNT_NUMBER_PREFIX, AccountNumber};
pub use types::{Account, Profile};
