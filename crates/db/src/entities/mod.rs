//! `SeaORM` entities.

pub mod accounts;
pub mod deposit_requests;
pub mod ledger_transactions;
pub mod sea_orm_active_enums;
