//! Core ledger rules for Remit.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Validation, fee arithmetic and balance planning live here. The `remit-db`
//! crate applies the plans inside database transactions.
//!
//! # Modules
//!
//! - `account` - Account numbers, profiles and the admin allow-list
//! - `ledger` - Transfer and adjustment planning, fees, ledger errors
//! - `deposit` - Deposit lifecycle, gateway seam, notification signatures
//! - `reports` - Read-model types for the query surface

pub mod account;
pub mod deposit;
pub mod ledger;
pub mod reports;
