//! Log-out route handler that revokes the session, invalidates the session cookie and redirects users.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{
    AppState,
    auth::cookie::{invalidate_session_cookie, read_session_cookie},
    endpoints,
    entry::{EntryEvent, EntryState},
    remote::{Backend, RemoteService},
    transaction::TransactionStore,
};

/// The state needed to log a user out.
#[derive(Debug, Clone)]
pub struct LogOutState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The remote service that issued the session.
    pub backend: Backend,
    /// The store holding the user's cached transactions.
    pub store: TransactionStore,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            backend: state.backend.clone(),
            store: state.transaction_store(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogOutState> for Key {
    fn from_ref(state: &LogOutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Revoke the session, discard the user's cached transactions, invalidate the
/// session cookie and redirect the client to the log-in page.
///
/// An expired session is revoked too, so its refresh token cannot be used
/// afterwards. Failing to revoke the session is only logged, the user is
/// logged out locally regardless.
pub async fn get_log_out(State(state): State<LogOutState>, jar: PrivateCookieJar) -> Response {
    let mut destination = endpoints::LOG_IN_VIEW;

    if let Ok(session) = read_session_cookie(&jar) {
        if let Err(error) = state.backend.sign_out(&session).await {
            tracing::warn!("Could not revoke session for {}: {error}", session.owner());
        }

        if let Err(error) = state.store.clear(session.owner()) {
            tracing::error!(
                "Could not clear cached transactions for {}: {error}",
                session.owner()
            );
        }

        tracing::info!("{} logged out", session.owner());

        match EntryState::Authenticated.transition(EntryEvent::SignedOut) {
            Ok(state) => destination = state.destination(),
            Err(error) => return error.into_response(),
        }
    }

    let jar = invalidate_session_cookie(jar);

    (jar, Redirect::to(destination)).into_response()
}
