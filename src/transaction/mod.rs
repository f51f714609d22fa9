//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the totals computed from a list of them
//! - The per-user cache and the store that keeps it in step with the remote service
//! - The endpoints for creating and deleting transactions

mod cache;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod store;

pub use cache::TransactionCache;
pub use core::{
    EXPENSE_CATEGORIES, INCOME_CATEGORIES, NewTransaction, Totals, Transaction, TransactionId,
    TransactionKind, totals,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use store::{Operation, TransactionCaches, TransactionStore};
