//! Personal finance bookkeeping: a transaction ledger with budgets and
//! savings goals, stored in SQLite, plus the tools that expose it to the
//! finance assistant.

mod categories;
mod error;
mod ledger;
mod models;
pub mod tools;

pub use categories::{CategoryPolicy, CategoryRules};
pub use error::FinanceError;
pub use ledger::{Ledger, TransactionFilter};
pub use models::*;
