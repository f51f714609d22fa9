//! Authentication middleware that validates the session cookie and handles redirects.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::OffsetDateTime;

use crate::{AppState, auth::cookie::get_or_refresh_session, endpoints, remote::Backend};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The remote service that refreshes expired sessions.
    pub backend: Backend,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            backend: state.backend.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
/// The session is placed into the request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned using `get_redirect`.
///
/// **Note**: Route handlers can use the function argument `Extension(session): Extension<Session>` to receive the session.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
///
/// A session whose access token has expired is refreshed and the new session
/// cookie is sent along with the response.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };
    let (session, jar) =
        match get_or_refresh_session(jar, &state.backend, OffsetDateTime::now_utc()).await {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::debug!(
                    "No valid session for {}: {error}. Redirecting to log in page.",
                    parts.uri.path()
                );
                return get_redirect(endpoints::LOG_IN_VIEW);
            }
        };

    parts.extensions.insert(session);
    let request = Request::from_parts(parts, body);

    (jar, next.run(request).await).into_response()
}

/// Middleware function that checks for a valid session cookie.
/// The session is placed into the request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid session cookie.
/// The session is placed into the request and then the request executed normally if the cookie is valid, otherwise a HTMX redirect to the log-in page is returned.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
