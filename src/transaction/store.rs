//! Reads and writes a user's transactions through the remote service and keeps
//! their cache in step with it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    Error,
    alert::Alert,
    auth::{OwnerId, Session},
    remote::{Backend, RemoteService},
    transaction::{NewTransaction, Totals, Transaction, TransactionCache, TransactionId},
};

/// The caches of every signed-in user, keyed by owner.
#[derive(Debug, Clone, Default)]
pub struct TransactionCaches(Arc<Mutex<HashMap<OwnerId, TransactionCache>>>);

impl TransactionCaches {
    /// Run `f` on the cache of `owner`, creating an empty cache if needed.
    ///
    /// The lock is held only while `f` runs, so `f` must not block.
    fn with_cache<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut TransactionCache) -> T,
    ) -> Result<T, Error> {
        let mut caches = self.0.lock().map_err(|error| {
            tracing::error!("could not acquire transaction cache lock: {error}");
            Error::CacheLockError
        })?;

        Ok(f(caches.entry(owner.clone()).or_default()))
    }

    fn remove(&self, owner: &OwnerId) -> Result<(), Error> {
        let mut caches = self.0.lock().map_err(|error| {
            tracing::error!("could not acquire transaction cache lock: {error}");
            Error::CacheLockError
        })?;
        caches.remove(owner);

        Ok(())
    }
}

/// The operations that report their outcome to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetching all transactions.
    Load,
    /// Creating a transaction.
    Add,
    /// Deleting a transaction.
    Remove,
}

impl Operation {
    /// The notice shown when the operation fails with `error`.
    pub fn failure_alert(self, error: &Error) -> Alert {
        let action = match self {
            Operation::Load => "fetch transactions",
            Operation::Add => "add transaction",
            Operation::Remove => "delete transaction",
        };

        Alert::error("Error", &format!("Failed to {action}: {error}"))
    }

    /// The notice shown when the operation succeeds, if any.
    pub fn success_alert(self) -> Option<Alert> {
        match self {
            Operation::Load => None,
            Operation::Add => Some(Alert::success("Success", "Transaction added successfully.")),
            Operation::Remove => Some(Alert::success(
                "Success",
                "Transaction deleted successfully.",
            )),
        }
    }
}

/// Fetches, creates and deletes transactions for a signed-in user.
///
/// Every change is sent to the remote service first, the cache is only
/// patched once the service has confirmed it. A cache that has never been
/// fetched is fetched in full instead of patched.
#[derive(Debug, Clone)]
pub struct TransactionStore<R = Backend> {
    remote: R,
    caches: TransactionCaches,
}

impl<R> TransactionStore<R>
where
    R: RemoteService,
{
    /// Create a store that sends requests to `remote` and keeps its results in `caches`.
    pub fn new(remote: R, caches: TransactionCaches) -> Self {
        Self { remote, caches }
    }

    /// Replace the cache of the session's user with a fresh fetch.
    ///
    /// On failure the cache keeps its previous contents.
    pub async fn load(&self, session: &Session) -> Result<(), Error> {
        let owner = session.owner();
        self.caches
            .with_cache(owner, |cache| cache.set_loading(true))?;

        let result = self.remote.select_transactions(session).await;

        self.caches.with_cache(owner, |cache| {
            cache.set_loading(false);

            match result {
                Ok(transactions) => {
                    tracing::debug!("loaded {} transactions for {owner}", transactions.len());
                    cache.replace(transactions);
                    Ok(())
                }
                Err(error) => {
                    tracing::error!("could not fetch transactions for {owner}: {error}");
                    Err(error)
                }
            }
        })?
    }

    /// Create a transaction for the session's user and put it first in their cache.
    ///
    /// On failure the cache is unchanged.
    pub async fn add(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        let created = self
            .remote
            .insert_transaction(session, transaction)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    "could not add transaction for {}: {error}",
                    session.owner()
                );
            })?;

        let patched = self.caches.with_cache(session.owner(), |cache| {
            if cache.is_seeded() {
                cache.prepend(created.clone());
            }

            cache.is_seeded()
        })?;

        if !patched {
            self.seed_after_change(session).await;
        }

        Ok(created)
    }

    /// Delete one of the session's user's transactions and drop it from their cache.
    ///
    /// On failure, including when there is no such transaction, the cache is unchanged.
    pub async fn remove(&self, session: &Session, id: &TransactionId) -> Result<(), Error> {
        self.remote
            .delete_transaction(session, id)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    "could not delete transaction {id} for {}: {error}",
                    session.owner()
                );
            })?;

        let patched = self.caches.with_cache(session.owner(), |cache| {
            if !cache.is_seeded() {
                return false;
            }

            if !cache.remove(id) {
                tracing::warn!("deleted transaction {id} was not in the cache");
            }

            true
        })?;

        if !patched {
            self.seed_after_change(session).await;
        }

        Ok(())
    }

    /// Fill a cache that was never fetched, e.g. after a restart, instead of
    /// patching a list that may be missing rows.
    ///
    /// The change itself has already succeeded, so a failed fetch only leaves
    /// the cache unseeded.
    async fn seed_after_change(&self, session: &Session) {
        if let Err(error) = self.load(session).await {
            tracing::warn!(
                "could not fetch transactions for {} after a change: {error}",
                session.owner()
            );
        }
    }

    /// A copy of the owner's cache.
    pub fn snapshot(&self, owner: &OwnerId) -> Result<TransactionCache, Error> {
        self.caches.with_cache(owner, |cache| cache.clone())
    }

    /// The income, expense and balance totals of the owner's cache.
    pub fn totals(&self, owner: &OwnerId) -> Result<Totals, Error> {
        self.caches.with_cache(owner, |cache| cache.totals())
    }

    /// Discard the owner's cache.
    pub fn clear(&self, owner: &OwnerId) -> Result<(), Error> {
        self.caches.remove(owner)
    }
}
