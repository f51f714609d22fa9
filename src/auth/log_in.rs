//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The remote service checks the credentials, this module only stores the session it hands back.

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::cookie::{invalidate_session_cookie, set_session_cookie},
    endpoints,
    entry::{EntryEvent, EntryState},
    html::{LINK_STYLE, base, loading_spinner, log_in_register, password_input, text_input},
    remote::{Backend, RemoteService},
};

/// A notice shown above the log-in form.
#[derive(Clone, Copy)]
pub(crate) enum LogInNotice<'a> {
    /// Something went wrong with the last attempt.
    Error(&'a str),
    /// Something the user should know before logging in.
    Info(&'a str),
}

pub(crate) fn log_in_form(email: &str, notice: Option<LogInNotice<'_>>) -> Markup {
    let error_message = match notice {
        Some(LogInNotice::Error(message)) => Some(message),
        _ => None,
    };

    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(LogInNotice::Info(message)) = notice {
                p id="log-in-notice" class="text-blue-600 dark:text-blue-400 text-base" { (message) }
            }

            (text_input("email", "Email", "email", email, "you@example.com", true))

            (password_input("", 0, error_message))

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

/// Render the full log-in page, optionally with a notice above the form.
pub(crate) fn log_in_page(email: &str, notice: Option<LogInNotice<'_>>) -> Markup {
    let log_in_form = log_in_form(email, notice);
    let content = log_in_register("Log in to your account", &log_in_form);

    base("Log In", &[], &content)
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    log_in_page("", None).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The remote service that checks the credentials.
    pub backend: Backend,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            backend: state.backend.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid login credentials.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session cookie is set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let email = user_data.email.trim();

    let session = match state.backend.sign_in(email, &user_data.password).await {
        Ok(session) => session,
        Err(Error::InvalidCredentials) => {
            return log_in_form(
                email,
                Some(LogInNotice::Error(INVALID_CREDENTIALS_ERROR_MSG)),
            )
            .into_response();
        }
        Err(Error::Remote(message)) => {
            tracing::warn!("Log in for {email} rejected by the remote service: {message}");
            return log_in_form(email, Some(LogInNotice::Error(&message))).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                email,
                Some(LogInNotice::Error(
                    "An internal error occurred. Please try again later.",
                )),
            )
            .into_response();
        }
    };

    tracing::info!("{} logged in", session.owner());

    let destination = match EntryState::Unauthenticated.transition(EntryEvent::SignedIn) {
        Ok(state) => state.destination(),
        Err(error) => return error.into_response(),
    };

    set_session_cookie(jar.clone(), &session)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(destination.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting session cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_session_cookie(jar),
            )
        })
        .into_response()
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// the remote service compares it against the password it stored at sign up.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,
}


#[cfg(test)]
mod log_in_tests {
    use axum::{
        Form, Router,
        extract::State,
        http::{HeaderMap, HeaderValue, StatusCode, header::COOKIE},
        response::Response,
        routing::post,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use sha2::{Digest, Sha512};
    use time::OffsetDateTime;

    use crate::{
        auth::cookie::{COOKIE_SESSION, get_session_from_cookies},
        endpoints,
        test_utils::{
            TEST_EMAIL, TEST_PASSWORD, assert_form_error_message, assert_hx_redirect,
            must_get_form, parse_html_fragment, sign_up_test_user, test_service,
        },
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, LoginState, post_log_in};

    async fn get_state() -> LoginState {
        let service = test_service();
        sign_up_test_user(&service).await;

        LoginState {
            cookie_key: Key::from(&Sha512::digest("foobar")),
            backend: service.into(),
        }
    }

    async fn new_log_in_request(state: LoginState, log_in_form: LogInData) -> Response {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(log_in_form)).await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: TEST_EMAIL.to_owned(),
                password: TEST_PASSWORD.to_owned(),
            },
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: TEST_EMAIL.to_owned(),
                password: "wrongpassword".to_owned(),
            },
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_state().await;

        let response = new_log_in_request(
            state,
            LogInData {
                email: "nobody@test.com".to_owned(),
                password: TEST_PASSWORD.to_owned(),
            },
        )
        .await;

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_sets_session_cookie() {
        let state = get_state().await;
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state.clone());
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: TEST_EMAIL.to_owned(),
                password: TEST_PASSWORD.to_owned(),
            })
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        let cookie = response.cookie(COOKIE_SESSION);
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{COOKIE_SESSION}={}", cookie.value())).unwrap(),
        );
        let jar = PrivateCookieJar::from_headers(&headers, state.cookie_key);
        let session = get_session_from_cookies(&jar, OffsetDateTime::now_utc())
            .expect("Could not read session from cookie");
        assert_eq!(session.user.email, TEST_EMAIL);
    }
}
