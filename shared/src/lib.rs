//! Shared types for the credit ledger
//!
//! Common types used by `ledger-server` and its callers: the sale record
//! consumed from the POS, the receivable ledger, reconciliation results,
//! the receivable summary read-model, and the unified error system.

pub mod error;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
