//! Bar Stock Valuation Platform - Backend Library
//!
//! The valuation and reconciliation engine: item catalog, movement
//! ledger, period and snapshot management, the stocktake lifecycle and
//! valuation reporting. Consumed by the server binary and the external
//! API layer.

pub mod config;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
