//! Finance Tracker is a web dashboard for recording income and expenses and
//! seeing where your money goes.
//!
//! This library provides a REST API that directly serves HTML pages. Storage
//! and authentication are delegated to a remote data service, see
//! [RemoteService].

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod endpoints;
mod entry;
mod html;
mod logging;
mod navigation;
mod remote;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{OwnerId, Session, User};
pub use config::BackendConfig;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use remote::{Backend, RemoteService, RestService, SqliteService};
pub use routing::build_router;
pub use transaction::{NewTransaction, Transaction, TransactionId, TransactionKind};

use crate::{alert::Alert, routing::render_internal_server_error};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password did not match a registered user.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Tried to register an email address that is already in use.
    #[error("User already registered")]
    DuplicateEmail,

    /// The email address given at registration is not usable.
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// The password given at registration does not meet the service's policy.
    #[error("{0}")]
    TooWeak(String),

    /// The session cookie is missing from the cookie jar in the request.
    #[error("no session cookie in the cookie jar")]
    CookieMissing,

    /// The session is unknown to the remote service or has expired.
    #[error("invalid or expired session")]
    SessionExpired,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A call to the remote data service failed.
    ///
    /// Holds the human-readable message reported by the service, or the
    /// transport error if the service could not be reached.
    #[error("{0}")]
    Remote(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a transaction that does not exist, or that belongs to
    /// another user.
    #[error("transaction not found")]
    DeleteMissingTransaction,

    /// A stored transaction type was neither "income" nor "expense".
    #[error("invalid transaction type \"{0}\"")]
    InvalidTransactionKind(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the lock on the transaction caches.
    #[error("could not acquire the transaction cache lock")]
    CacheLockError,

    /// Could not acquire the lock on the database connection.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The server was started with an unusable combination of settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The entry page was asked to make a transition its state machine does not allow.
    #[error("cannot handle {event} while {state}")]
    InvalidEntryTransition {
        /// The name of the state the entry page was in.
        state: &'static str,
        /// The name of the rejected event.
        event: &'static str,
    },
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        tracing::error!("request to the remote service failed: {value}");
        Error::Remote(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => routing::get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => render_internal_server_error(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error(
                    "Sorry, something went wrong.",
                    "Try again later or check the server logs",
                )
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error(
                    "Invalid Timezone Settings",
                    &format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                ),
            )
                .into_response(),
            Error::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                Alert::error(
                    "Session expired",
                    "Your session has expired. Log in again to continue.",
                ),
            )
                .into_response(),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    ),
                )
                    .into_response()
            }
        }
    }
}
