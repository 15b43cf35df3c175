use thiserror::Error;

use super::TransactionType;

/// Errors raised by the ledger.
#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("amount must be a positive number, got {0}")]
    InvalidAmount(f64),
    #[error("category must not be empty")]
    EmptyCategory,
    #[error("'{category}' is not a known {kind} category (expected one of: {allowed})")]
    UnknownCategory {
        kind: TransactionType,
        category: String,
        allowed: String,
    },
    #[error("goal name must not be empty")]
    EmptyGoalName,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("goal #{0} not found")]
    GoalNotFound(i64),
    #[error("goal #{0} is no longer active")]
    GoalNotActive(i64),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

impl FinanceError {
    /// Returns `true` if the error was caused by the caller's input rather
    /// than by the storage layer.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, FinanceError::Storage(_) | FinanceError::Io(_))
    }
}
