//! The entry page that decides whether a visitor sees the dashboard or the log-in page.
//!
//! The page starts out loading and asks the server to resolve the session
//! cookie. The resolved state decides where the client is sent next.

use std::fmt::Display;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::html;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{AuthState, get_or_refresh_session, invalidate_session_cookie},
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, loading_view},
};

/// Where a visitor stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The session cookie has not been checked yet.
    AuthLoading,
    /// There is no valid session.
    Unauthenticated,
    /// The visitor has a valid session.
    Authenticated,
}

/// Something that changes a visitor's [EntryState].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEvent {
    /// The session cookie was missing, unreadable or expired.
    NoSession,
    /// The session cookie held a valid session.
    SessionFound,
    /// The remote service accepted the visitor's credentials.
    SignedIn,
    /// The visitor logged out.
    SignedOut,
}

impl EntryState {
    /// Apply `event`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEntryTransition] if `event` cannot happen in the current state.
    pub fn transition(self, event: EntryEvent) -> Result<EntryState, Error> {
        match (self, event) {
            (EntryState::AuthLoading, EntryEvent::NoSession) => Ok(EntryState::Unauthenticated),
            (EntryState::AuthLoading, EntryEvent::SessionFound) => Ok(EntryState::Authenticated),
            (EntryState::Unauthenticated, EntryEvent::SignedIn) => Ok(EntryState::Authenticated),
            (EntryState::Authenticated, EntryEvent::SignedOut) => Ok(EntryState::Unauthenticated),
            (state, event) => {
                tracing::error!("rejected entry transition: {event} while {state}");
                Err(Error::InvalidEntryTransition {
                    state: state.name(),
                    event: event.name(),
                })
            }
        }
    }

    /// The page a visitor in this state should be shown.
    pub fn destination(self) -> &'static str {
        match self {
            EntryState::AuthLoading => endpoints::ROOT,
            EntryState::Unauthenticated => endpoints::LOG_IN_VIEW,
            EntryState::Authenticated => endpoints::DASHBOARD_VIEW,
        }
    }

    fn name(self) -> &'static str {
        match self {
            EntryState::AuthLoading => "auth-loading",
            EntryState::Unauthenticated => "unauthenticated",
            EntryState::Authenticated => "authenticated",
        }
    }
}

impl Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl EntryEvent {
    fn name(self) -> &'static str {
        match self {
            EntryEvent::NoSession => "no-session",
            EntryEvent::SessionFound => "session-found",
            EntryEvent::SignedIn => "signed-in",
            EntryEvent::SignedOut => "signed-out",
        }
    }
}

impl Display for EntryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Display the entry page in its loading state.
///
/// The page immediately asks [resolve_session] where to go next.
pub async fn get_entry_page() -> Response {
    let content = html!(
        div
            id="entry"
            hx-get=(endpoints::SESSION_API)
            hx-trigger="load"
            hx-target-error="#alert-container"
            class=(PAGE_CONTAINER_STYLE)
        {
            (loading_view("Loading..."))
        }
    );

    base("Welcome", &[], &content).into_response()
}

/// Resolve the entry page's loading state from the session cookie and
/// redirect the client to the dashboard or the log-in page.
///
/// An expired session is refreshed if it can be, otherwise a cookie that no
/// longer holds a valid session is removed.
pub async fn resolve_session(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    let (event, jar) =
        match get_or_refresh_session(jar.clone(), &state.backend, OffsetDateTime::now_utc()).await {
            Ok((_, jar)) => (EntryEvent::SessionFound, jar),
            Err(Error::CookieMissing) => (EntryEvent::NoSession, jar),
            Err(error) => {
                tracing::debug!("discarding session cookie: {error}");
                (EntryEvent::NoSession, invalidate_session_cookie(jar))
            }
        };

    match EntryState::AuthLoading.transition(event) {
        Ok(state) => (
            StatusCode::OK,
            HxRedirect(state.destination().to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => error.into_alert_response(),
    }
}
