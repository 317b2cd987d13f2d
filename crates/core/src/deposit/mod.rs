//! Deposit reconciliation rules.
//!
//! A deposit request is created `pending`, funded through an external payment
//! gateway, and credited exactly once when the gateway confirms it. Gateway
//! notifications are only trusted after their signature has been verified.

pub mod gateway;
pub mod notification;
pub mod types;

pub use gateway::{FundingInstrument, FundingRequest, GatewayError, PaymentGateway};
pub use notification::{GatewayNotification, NotificationError, NotificationVerifier};
pub use types::{DepositConfirmation, DepositRequest, DepositStatus, GatewayStatus, GatewayUpdate};
