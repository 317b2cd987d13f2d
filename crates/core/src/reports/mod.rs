//! Read models for the query surface.
//!
//! Reports are computed outside the mutating atomic units and may lag them.

pub mod types;

pub use types::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, SystemStats};
