//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    remote::Backend,
    transaction::{TransactionCaches, TransactionStore},
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,

    /// The remote service that stores users and transactions.
    pub backend: Backend,

    /// The cached transactions of every signed-in user.
    pub transaction_caches: TransactionCaches,
}

impl AppState {
    /// Create a new [AppState] that delegates storage and authentication to `backend`.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Kolkata".
    pub fn new(backend: impl Into<Backend>, cookie_secret: &str, local_timezone: &str) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            local_timezone: local_timezone.to_owned(),
            backend: backend.into(),
            transaction_caches: TransactionCaches::default(),
        }
    }

    /// A store for reading and writing transactions through the remote service.
    pub(crate) fn transaction_store(&self) -> TransactionStore {
        TransactionStore::new(self.backend.clone(), self.transaction_caches.clone())
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
