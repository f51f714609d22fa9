//! The registration page for creating an account with the remote service.

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
    auth::{
        cookie::{invalidate_session_cookie, set_session_cookie},
        log_in::{LogInNotice, log_in_form},
    },
    endpoints,
    entry::{EntryEvent, EntryState},
    html::{LINK_STYLE, base, loading_spinner, log_in_register, password_input, text_input},
    remote::{Backend, RemoteService},
};

/// The minimum number of characters the password should have to be considered valid on the
/// client side (the remote service applies its own policy on top of this).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 6;

/// Shown on the log-in page when the remote service wants the email confirmed first.
pub const CONFIRM_EMAIL_MESSAGE: &str =
    "Account created. Check your email to confirm your address, then log in.";

/// Errors to show next to the registration form's inputs.
#[derive(Default)]
struct RegistrationErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
}

fn registration_form(form: &RegisterForm, errors: RegistrationErrors<'_>) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                (text_input("email", "Email", "email", &form.email, "you@example.com", true))

                @if let Some(error_message) = errors.email
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            (text_input("username", "Username", "text", &form.username, "Your name", false))

            (password_input(&form.password, PASSWORD_INPUT_MIN_LENGTH, errors.password))

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form(&RegisterForm::default(), RegistrationErrors::default());
    let content = log_in_register("Create an account", &registration_form);

    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The remote service that owns the user accounts.
    pub backend: Backend,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            backend: state.backend.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data entered by the user in the registration form.
#[derive(Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    #[serde(default)]
    pub username: String,
    pub password: String,
}

/// Handler for registration requests.
///
/// If the remote service signs the new user in straight away, the session
/// cookie is set and the client is redirected to the dashboard. If the service
/// wants the email confirmed first, the log-in form is shown with a notice.
/// Rejected registrations re-render the form with the service's message.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = user_data.email.trim();
    let username = user_data.username.trim();

    let session = match state
        .backend
        .sign_up(email, &user_data.password, username)
        .await
    {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::info!("Registered {email}, waiting for email confirmation");
            return log_in_form(email, Some(LogInNotice::Info(CONFIRM_EMAIL_MESSAGE)))
                .into_response();
        }
        Err(error @ (Error::DuplicateEmail | Error::InvalidEmail)) => {
            let message = error.to_string();
            let errors = RegistrationErrors {
                email: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
        Err(Error::TooWeak(message) | Error::Remote(message)) => {
            let errors = RegistrationErrors {
                password: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while registering {email}: {error}");
            return (
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response();
        }
    };

    tracing::info!("Registered and logged in {}", session.owner());

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
