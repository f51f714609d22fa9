//! A self-hosted remote service backed by a SQLite database.
//!
//! Accounts, sessions and transactions live in one database file. Every data
//! call resolves the session's access token to its owner first, and every
//! query is filtered by that owner, the same guarantee row-level security
//! gives a hosted service.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    Error,
    auth::{OwnerId, REFRESH_WINDOW, Session, User},
    remote::RemoteService,
    transaction::{NewTransaction, Transaction, TransactionId, TransactionKind},
};

/// The shortest password accepted at sign up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Stores accounts, sessions and transactions in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteService {
    connection: Arc<Mutex<Connection>>,
    session_duration: Duration,
    hash_cost: u32,
}

impl SqliteService {
    /// Create the service, adding any missing tables to the database.
    ///
    /// Sessions issued by the service stay valid for `session_duration`.
    ///
    /// # Errors
    /// Returns an error if the tables cannot be created.
    pub fn new(connection: Connection, session_duration: Duration) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            session_duration,
            hash_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Set the bcrypt cost used to hash new passwords.
    ///
    /// A value of at least 12 is recommended, the default is [bcrypt::DEFAULT_COST].
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    fn create_session(&self, connection: &Connection, user: User) -> Result<Session, Error> {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = OffsetDateTime::now_utc() + self.session_duration;

        connection.execute(
            "INSERT INTO session (token, refresh_token, user_id, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            (&access_token, &refresh_token, user.id.as_str(), expires_at),
        )?;

        Ok(Session {
            user,
            access_token,
            expires_at,
            refresh_token: Some(refresh_token),
        })
    }

    fn sign_in_blocking(&self, email: &str, password: &str) -> Result<Session, Error> {
        let connection = self.lock()?;

        let row = connection
            .prepare("SELECT id, email, username, password FROM user WHERE email = ?1")?
            .query_row([email.trim()], |row| {
                Ok((map_user_row(row)?, row.get::<_, String>(3)?))
            })
            .optional()?;

        let Some((user, password_hash)) = row else {
            return Err(Error::InvalidCredentials);
        };

        match bcrypt::verify(password, &password_hash) {
            Ok(true) => self.create_session(&connection, user),
            Ok(false) => Err(Error::InvalidCredentials),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    fn sign_up_blocking(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, Error> {
        let email = email.trim();
        validate_email(email)?;

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::TooWeak(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }

        let password_hash = bcrypt::hash(password, self.hash_cost)
            .map_err(|error| Error::HashingError(error.to_string()))?;

        let username = match username.trim() {
            "" => None,
            username => Some(username.to_owned()),
        };
        let user = User {
            id: OwnerId::new(Uuid::new_v4().to_string()),
            email: email.to_owned(),
            username,
        };

        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO user (id, email, username, password) VALUES (?1, ?2, ?3, ?4)",
            (user.id.as_str(), &user.email, &user.username, &password_hash),
        )?;

        self.create_session(&connection, user).map(Some)
    }

    /// Swap the session's refresh token for a new session.
    ///
    /// Each refresh token can be used once, and only within [REFRESH_WINDOW]
    /// of its access token expiring.
    fn refresh_session_blocking(&self, session: &Session) -> Result<Session, Error> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(Error::SessionExpired);
        };

        let connection = self.lock()?;
        let row: Option<(User, OffsetDateTime)> = connection
            .prepare(
                "SELECT user.id, user.email, user.username, session.expires_at
                 FROM session INNER JOIN user ON user.id = session.user_id
                 WHERE session.refresh_token = ?1",
            )?
            .query_row([refresh_token], |row| Ok((map_user_row(row)?, row.get(3)?)))
            .optional()?;

        let Some((user, expires_at)) = row else {
            return Err(Error::SessionExpired);
        };

        connection.execute(
            "DELETE FROM session WHERE refresh_token = ?1",
            [refresh_token],
        )?;

        if OffsetDateTime::now_utc() >= expires_at + REFRESH_WINDOW {
            return Err(Error::SessionExpired);
        }

        self.create_session(&connection, user)
    }

    fn sign_out_blocking(&self, session: &Session) -> Result<(), Error> {
        self.lock()?
            .execute("DELETE FROM session WHERE token = ?1", [&session.access_token])?;

        Ok(())
    }

    fn select_transactions_blocking(&self, session: &Session) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;
        let owner = authorize(&connection, session)?;

        connection
            .prepare(
                "SELECT id, user_id, type, amount, category, description, date, created_at
                 FROM transactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?
            .query_map([owner.as_str()], map_transaction_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }

    fn insert_transaction_blocking(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        let owner = authorize(&connection, session)?;

        let transaction = connection
            .prepare(
                "INSERT INTO transactions
                    (id, user_id, type, amount, category, description, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 RETURNING id, user_id, type, amount, category, description, date, created_at",
            )?
            .query_row(
                (
                    Uuid::new_v4().to_string(),
                    owner.as_str(),
                    transaction.kind,
                    transaction.amount,
                    &transaction.category,
                    &transaction.description,
                    transaction.date,
                    OffsetDateTime::now_utc(),
                ),
                map_transaction_row,
            )?;

        Ok(transaction)
    }

    fn delete_transaction_blocking(
        &self,
        session: &Session,
        id: &TransactionId,
    ) -> Result<(), Error> {
        let connection = self.lock()?;
        let owner = authorize(&connection, session)?;

        let rows_affected = connection.execute(
            "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
            (id.as_str(), owner.as_str()),
        )?;

        match rows_affected {
            0 => Err(Error::DeleteMissingTransaction),
            _ => Ok(()),
        }
    }
}

impl RemoteService for SqliteService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        self.sign_in_blocking(email, password)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, Error> {
        self.sign_up_blocking(email, password, username)
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, Error> {
        self.refresh_session_blocking(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), Error> {
        self.sign_out_blocking(session)
    }

    async fn select_transactions(&self, session: &Session) -> Result<Vec<Transaction>, Error> {
        self.select_transactions_blocking(session)
    }

    async fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        self.insert_transaction_blocking(session, transaction)
    }

    async fn delete_transaction(&self, session: &Session, id: &TransactionId) -> Result<(), Error> {
        self.delete_transaction_blocking(session, id)
    }
}

/// Create the tables for users, sessions and transactions if they do not exist.
fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            username TEXT,
            password TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session (
            token TEXT PRIMARY KEY,
            refresh_token TEXT UNIQUE NOT NULL,
            user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            amount REAL NOT NULL CHECK (amount >= 0),
            category TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user_created
            ON transactions(user_id, created_at);",
    )?;

    Ok(())
}

/// Resolve the session's access token to the user that owns it.
///
/// # Errors
/// Returns [Error::SessionExpired] if the token is unknown or has expired.
fn authorize(connection: &Connection, session: &Session) -> Result<OwnerId, Error> {
    let row: Option<(String, OffsetDateTime)> = connection
        .prepare("SELECT user_id, expires_at FROM session WHERE token = ?1")?
        .query_row([&session.access_token], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;

    match row {
        Some((user_id, expires_at)) if OffsetDateTime::now_utc() < expires_at => {
            Ok(OwnerId::new(user_id))
        }
        _ => Err(Error::SessionExpired),
    }
}

fn validate_email(email: &str) -> Result<(), Error> {
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidEmail),
    }
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: OwnerId::new(row.get::<_, String>(0)?),
        email: row.get(1)?,
        username: row.get(2)?,
    })
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: TransactionId::new(row.get::<_, String>(0)?),
        user_id: OwnerId::new(row.get::<_, String>(1)?),
        kind: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        TransactionKind::try_from(value.as_str()?)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod sqlite_service_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::date};

    use crate::{
        Error,
        remote::RemoteService,
        transaction::{NewTransaction, TransactionId, TransactionKind},
    };

    use super::SqliteService;

    fn get_service() -> SqliteService {
        let connection = Connection::open_in_memory().unwrap();

        SqliteService::new(connection, Duration::hours(1))
            .unwrap()
            .with_hash_cost(4)
    }

    #[tokio::test]
    async fn sign_up_returns_session() {
        let service = get_service();

        let session = service
            .sign_up("test@test.com", "hunter2", "Ada")
            .await
            .unwrap()
            .expect("want a session after sign up");

        assert_eq!(session.user.email, "test@test.com");
        assert_eq!(session.user.username.as_deref(), Some("Ada"));
        assert!(!session.access_token.is_empty());
    }

    #[tokio::test]
    async fn sign_up_without_username() {
        let service = get_service();

        let session = service
            .sign_up("test@test.com", "hunter2", "  ")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.user.username, None);
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email() {
        let service = get_service();
        service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap();

        let got = service.sign_up("test@test.com", "hunter3", "").await;

        assert_eq!(got, Err(Error::DuplicateEmail));
    }

    #[tokio::test]
    async fn sign_up_rejects_short_password() {
        let service = get_service();

        let got = service.sign_up("test@test.com", "12345", "").await;

        assert_eq!(
            got,
            Err(Error::TooWeak(
                "Password should be at least 6 characters.".to_owned()
            ))
        );
    }

    #[tokio::test]
    async fn sign_up_rejects_invalid_email() {
        let service = get_service();

        for email in ["", "test", "@test.com", "test@", "te st@test.com"] {
            let got = service.sign_up(email, "hunter2", "").await;

            assert_eq!(got, Err(Error::InvalidEmail), "email {email:?}");
        }
    }

    #[tokio::test]
    async fn sign_in_with_correct_password() {
        let service = get_service();
        let signed_up = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        let session = service.sign_in("test@test.com", "hunter2").await.unwrap();

        assert_eq!(session.user, signed_up.user);
        assert_ne!(session.access_token, signed_up.access_token);
    }

    #[tokio::test]
    async fn sign_in_with_wrong_password_or_email() {
        let service = get_service();
        service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap();

        assert_eq!(
            service.sign_in("test@test.com", "hunter3").await,
            Err(Error::InvalidCredentials)
        );
        assert_eq!(
            service.sign_in("other@test.com", "hunter2").await,
            Err(Error::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn inserted_transactions_are_listed_newest_first() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        let first = service
            .insert_transaction(
                &session,
                &NewTransaction::new(TransactionKind::Income, 1000.0, "Salary", date!(2024 - 01 - 01)),
            )
            .await
            .unwrap();
        let second = service
            .insert_transaction(
                &session,
                &NewTransaction::new(TransactionKind::Expense, 200.0, "Food", date!(2024 - 01 - 02))
                    .description("Groceries"),
            )
            .await
            .unwrap();

        let got = service.select_transactions(&session).await.unwrap();

        assert_eq!(got, vec![second.clone(), first]);
        assert_eq!(second.user_id, session.user.id);
        assert_eq!(second.description, "Groceries");
    }

    #[tokio::test]
    async fn transactions_are_scoped_to_owner() {
        let service = get_service();
        let alice = service
            .sign_up("alice@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();
        let bob = service
            .sign_up("bob@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();
        let alices = service
            .insert_transaction(
                &alice,
                &NewTransaction::new(TransactionKind::Expense, 5.0, "Food", date!(2024 - 01 - 01)),
            )
            .await
            .unwrap();

        assert_eq!(service.select_transactions(&bob).await, Ok(vec![]));
        assert_eq!(
            service.delete_transaction(&bob, &alices.id).await,
            Err(Error::DeleteMissingTransaction)
        );
        assert_eq!(
            service.select_transactions(&alice).await,
            Ok(vec![alices])
        );
    }

    #[tokio::test]
    async fn delete_removes_transaction() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();
        let transaction = service
            .insert_transaction(
                &session,
                &NewTransaction::new(TransactionKind::Expense, 5.0, "Food", date!(2024 - 01 - 01)),
            )
            .await
            .unwrap();

        service
            .delete_transaction(&session, &transaction.id)
            .await
            .unwrap();

        assert_eq!(service.select_transactions(&session).await, Ok(vec![]));
        assert_eq!(
            service.delete_transaction(&session, &transaction.id).await,
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[tokio::test]
    async fn delete_missing_transaction_fails() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        let got = service
            .delete_transaction(&session, &TransactionId::new("missing"))
            .await;

        assert_eq!(got, Err(Error::DeleteMissingTransaction));
    }

    #[tokio::test]
    async fn signed_out_session_is_rejected() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        service.sign_out(&session).await.unwrap();

        assert_eq!(
            service.select_transactions(&session).await,
            Err(Error::SessionExpired)
        );
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let connection = Connection::open_in_memory().unwrap();
        let service = SqliteService::new(connection, Duration::seconds(-1))
            .unwrap()
            .with_hash_cost(4);
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            service.select_transactions(&session).await,
            Err(Error::SessionExpired)
        );
    }

    #[tokio::test]
    async fn refresh_replaces_session() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        let refreshed = service.refresh_session(&session).await.unwrap();

        assert_eq!(refreshed.user, session.user);
        assert_ne!(refreshed.access_token, session.access_token);
        assert_ne!(refreshed.refresh_token, session.refresh_token);
        assert_eq!(service.select_transactions(&refreshed).await, Ok(vec![]));
        assert_eq!(
            service.select_transactions(&session).await,
            Err(Error::SessionExpired)
        );
    }

    #[tokio::test]
    async fn expired_session_can_be_refreshed_once() {
        let connection = Connection::open_in_memory().unwrap();
        let service = SqliteService::new(connection, Duration::seconds(-1))
            .unwrap()
            .with_hash_cost(4);
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        assert!(service.refresh_session(&session).await.is_ok());
        assert_eq!(
            service.refresh_session(&session).await,
            Err(Error::SessionExpired)
        );
    }

    #[tokio::test]
    async fn signed_out_session_cannot_be_refreshed() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        service.sign_out(&session).await.unwrap();

        assert_eq!(
            service.refresh_session(&session).await,
            Err(Error::SessionExpired)
        );
    }

    #[tokio::test]
    async fn rejects_negative_amount() {
        let service = get_service();
        let session = service
            .sign_up("test@test.com", "hunter2", "")
            .await
            .unwrap()
            .unwrap();

        let got = service
            .insert_transaction(
                &session,
                &NewTransaction::new(TransactionKind::Expense, -5.0, "Food", date!(2024 - 01 - 01)),
            )
            .await;

        assert!(matches!(got, Err(Error::SqlError(_))));
        assert_eq!(service.select_transactions(&session).await, Ok(vec![]));
    }
}
