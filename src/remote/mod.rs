//! The boundary to the remote data service that owns user accounts and transactions.
//!
//! The service is responsible for durability, for assigning transaction IDs
//! and creation times, and for scoping every row to its owner. The rest of the
//! crate only talks to it through [RemoteService].

mod rest;
mod sqlite;

pub use rest::RestService;
pub use sqlite::SqliteService;

use crate::{
    Error,
    auth::Session,
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// Hosted authentication and transaction storage.
///
/// Every call is a single round trip. Errors carry a human-readable message
/// that can be shown to the user, see [Error::Remote].
pub trait RemoteService {
    /// Exchange an email and password for a session.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the email and password do not
    /// match a registered user.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Register a new user.
    ///
    /// Returns the new user's session, or `None` if the service requires the
    /// user to confirm their email before they can sign in.
    ///
    /// # Errors
    /// Returns [Error::DuplicateEmail] if the email is already registered, or
    /// [Error::TooWeak] if the password does not meet the service's policy.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> impl Future<Output = Result<Option<Session>, Error>> + Send;

    /// Exchange the refresh token of an expired `session` for a new session.
    ///
    /// # Errors
    /// Returns [Error::SessionExpired] if the session has no refresh token or
    /// the service no longer accepts it.
    fn refresh_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Revoke `session`.
    fn sign_out(&self, session: &Session) -> impl Future<Output = Result<(), Error>> + Send;

    /// Get all transactions owned by the session's user, most recently created first.
    fn select_transactions(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<Transaction>, Error>> + Send;

    /// Store a transaction for the session's user.
    ///
    /// Returns the stored row with its server-assigned ID and creation time.
    fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> impl Future<Output = Result<Transaction, Error>> + Send;

    /// Delete one of the session's user's transactions.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingTransaction] if no transaction with `id`
    /// is owned by the session's user.
    fn delete_transaction(
        &self,
        session: &Session,
        id: &TransactionId,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// The remote service the server was configured with.
#[derive(Debug, Clone)]
pub enum Backend {
    /// A Supabase compatible REST API.
    Rest(RestService),
    /// A local SQLite database.
    Sqlite(SqliteService),
}

impl RemoteService for Backend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        match self {
            Backend::Rest(service) => service.sign_in(email, password).await,
            Backend::Sqlite(service) => service.sign_in(email, password).await,
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, Error> {
        match self {
            Backend::Rest(service) => service.sign_up(email, password, username).await,
            Backend::Sqlite(service) => service.sign_up(email, password, username).await,
        }
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, Error> {
        match self {
            Backend::Rest(service) => service.refresh_session(session).await,
            Backend::Sqlite(service) => service.refresh_session(session).await,
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), Error> {
        match self {
            Backend::Rest(service) => service.sign_out(session).await,
            Backend::Sqlite(service) => service.sign_out(session).await,
        }
    }

    async fn select_transactions(&self, session: &Session) -> Result<Vec<Transaction>, Error> {
        match self {
            Backend::Rest(service) => service.select_transactions(session).await,
            Backend::Sqlite(service) => service.select_transactions(session).await,
        }
    }

    async fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        match self {
            Backend::Rest(service) => service.insert_transaction(session, transaction).await,
            Backend::Sqlite(service) => service.insert_transaction(session, transaction).await,
        }
    }

    async fn delete_transaction(&self, session: &Session, id: &TransactionId) -> Result<(), Error> {
        match self {
            Backend::Rest(service) => service.delete_transaction(session, id).await,
            Backend::Sqlite(service) => service.delete_transaction(session, id).await,
        }
    }
}

impl From<SqliteService> for Backend {
    fn from(service: SqliteService) -> Self {
        Backend::Sqlite(service)
    }
}

impl From<RestService> for Backend {
    fn from(service: RestService) -> Self {
        Backend::Rest(service)
    }
}
