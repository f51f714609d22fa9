//! The in-memory copy of a user's transactions.

use crate::transaction::{Totals, Transaction, TransactionId, totals};

/// A user's transactions, most recently created first.
///
/// The cache is seeded by a full fetch from the remote service and then
/// patched as the service confirms each insert and delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionCache {
    transactions: Vec<Transaction>,
    loading: bool,
    seeded: bool,
}

impl TransactionCache {
    /// The cached transactions, most recently created first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The `count` most recently created transactions.
    pub fn recent(&self, count: usize) -> &[Transaction] {
        &self.transactions[..count.min(self.transactions.len())]
    }

    /// Whether a fetch from the remote service is in progress.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the cache has been filled by a successful fetch.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Sum the cached transactions.
    pub fn totals(&self) -> Totals {
        totals(&self.transactions)
    }

    pub(super) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Replace the cached transactions with a fresh fetch.
    pub(super) fn replace(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
        self.seeded = true;
    }

    /// Add a newly created transaction to the front of the list.
    pub(super) fn prepend(&mut self, transaction: Transaction) {
        self.transactions.insert(0, transaction);
    }

    /// Remove the transaction with `id`, returning whether it was cached.
    pub(super) fn remove(&mut self, id: &TransactionId) -> bool {
        let count_before = self.transactions.len();
        self.transactions.retain(|transaction| &transaction.id != id);

        self.transactions.len() != count_before
    }
}
