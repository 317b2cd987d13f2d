//! Shared types, errors, and configuration for Remit.
//!
//! This crate provides common types used across all other crates:
//! - Exact money types and ledger minor-unit conversion
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AdminConfig, AppConfig, DatabaseConfig, GatewayConfig, LedgerConfig, ServerConfig};
pub use error::{AppError, AppResult};
