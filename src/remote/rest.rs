//! A client for a hosted, Supabase compatible backend.
//!
//! Authentication goes through the GoTrue endpoints under `/auth/v1` and
//! transactions are read and written through the PostgREST endpoints under
//! `/rest/v1`.

use reqwest::{
    Client as HttpClient, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{OwnerId, Session, User},
    remote::RemoteService,
    transaction::{NewTransaction, Transaction, TransactionId, TransactionKind},
};

const API_KEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Talks to a Supabase compatible REST API.
#[derive(Debug, Clone)]
pub struct RestService {
    http_client: HttpClient,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    username: &'a str,
}

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

#[derive(Serialize)]
struct InsertRow<'a> {
    user_id: &'a OwnerId,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: f64,
    category: &'a str,
    description: &'a str,
    #[serde(with = "date_format")]
    date: Date,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(self.expires_in);

        Session {
            user: User {
                id: OwnerId::new(self.user.id),
                email: self.user.email.unwrap_or_default(),
                username: self.user.user_metadata.username,
            },
            access_token: self.access_token,
            expires_at,
            refresh_token: self.refresh_token,
        }
    }
}

impl RestService {
    /// Create a client for the service at `base_url`, e.g. "https://xyz.supabase.co".
    ///
    /// `anon_key` is the service's public API key.
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transactions_url(&self, filters: &[(&str, String)]) -> Result<String, Error> {
        let query = serde_urlencoded::to_string(filters)
            .map_err(|error| Error::Remote(format!("could not encode query: {error}")))?;

        Ok(format!("{}/rest/v1/transactions?{query}", self.base_url))
    }

    /// Add the API key and, for signed in calls, the session's bearer token.
    fn authorize(
        &self,
        request: RequestBuilder,
        session: Option<&Session>,
    ) -> Result<RequestBuilder, Error> {
        let request = request.header(API_KEY_HEADER, &self.anon_key);

        let bearer = match session {
            Some(session) => &session.access_token,
            None => &self.anon_key,
        };
        let auth_value = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|error| Error::Remote(format!("Failed to create auth header: {error}")))?;

        Ok(request.header(AUTHORIZATION, auth_value))
    }

    /// Turn an unsuccessful response into an [Error].
    async fn handle_error_response(response: Response) -> Error {
        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();
        let message = error_message(status, &body_text);

        tracing::warn!("remote service responded with {status}: {message}");

        match status {
            StatusCode::UNAUTHORIZED => Error::SessionExpired,
            _ => classify_auth_message(message),
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, Error> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        Ok(response)
    }
}

/// Pick the human-readable message out of an error body.
///
/// GoTrue uses `msg` or `error_description`, PostgREST uses `message`.
fn error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(body) = serde_json::from_str::<serde_json::Value>(body_text) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(message) = body.get(key).and_then(|value| value.as_str()) {
                return message.to_owned();
            }
        }
    }

    match body_text.trim() {
        "" => format!("request failed with status {status}"),
        text => text.to_owned(),
    }
}

fn classify_auth_message(message: String) -> Error {
    if message == Error::InvalidCredentials.to_string() {
        Error::InvalidCredentials
    } else if message == Error::DuplicateEmail.to_string() {
        Error::DuplicateEmail
    } else if message.starts_with("Unable to validate email address") {
        Error::InvalidEmail
    } else if message.starts_with("Password should") {
        Error::TooWeak(message)
    } else {
        Error::Remote(message)
    }
}

impl RemoteService for RestService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let request = self
            .http_client
            .post(self.url("/auth/v1/token?grant_type=password"))
            .json(&Credentials { email, password });
        let response = Self::send(self.authorize(request, None)?).await;

        let response = match response {
            Ok(response) => response,
            // There is no session yet, so a 401 can only mean the request was refused.
            Err(Error::SessionExpired) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        };

        Ok(response.json::<TokenResponse>().await?.into_session())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, Error> {
        let request = self
            .http_client
            .post(self.url("/auth/v1/signup"))
            .json(&SignUpRequest {
                email,
                password,
                data: SignUpData { username },
            });
        let response = Self::send(self.authorize(request, None)?).await?;

        // Without email confirmation the service signs the user in straight
        // away, otherwise it only returns the new user.
        let body: serde_json::Value = response.json().await?;
        if body.get("access_token").is_none() {
            return Ok(None);
        }

        let token: TokenResponse = serde_json::from_value(body)?;

        Ok(Some(token.into_session()))
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, Error> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(Error::SessionExpired);
        };

        let request = self
            .http_client
            .post(self.url("/auth/v1/token?grant_type=refresh_token"))
            .json(&RefreshRequest { refresh_token });

        match Self::send(self.authorize(request, None)?).await {
            Ok(response) => Ok(response.json::<TokenResponse>().await?.into_session()),
            // GoTrue refuses a used or revoked refresh token with a 400.
            Err(Error::Remote(message)) => {
                tracing::debug!("could not refresh session: {message}");
                Err(Error::SessionExpired)
            }
            Err(error) => Err(error),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), Error> {
        let request = self.http_client.post(self.url("/auth/v1/logout"));
        Self::send(self.authorize(request, Some(session))?).await?;

        Ok(())
    }

    async fn select_transactions(&self, session: &Session) -> Result<Vec<Transaction>, Error> {
        let url = self.transactions_url(&[
            ("select", "*".to_owned()),
            ("user_id", format!("eq.{}", session.owner())),
            ("order", "created_at.desc".to_owned()),
        ])?;
        let request = self.http_client.get(url);
        let response = Self::send(self.authorize(request, Some(session))?).await?;

        Ok(response.json().await?)
    }

    async fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        let row = InsertRow {
            user_id: session.owner(),
            kind: transaction.kind,
            amount: transaction.amount,
            category: &transaction.category,
            description: &transaction.description,
            date: transaction.date,
        };
        let request = self
            .http_client
            .post(self.url("/rest/v1/transactions"))
            .header(PREFER_HEADER, RETURN_REPRESENTATION)
            .json(&[row]);
        let response = Self::send(self.authorize(request, Some(session))?).await?;

        let mut rows: Vec<Transaction> = response.json().await?;

        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(Error::Remote(
                "the service did not return the new transaction".to_owned(),
            )),
        }
    }

    async fn delete_transaction(&self, session: &Session, id: &TransactionId) -> Result<(), Error> {
        let url = self.transactions_url(&[
            ("id", format!("eq.{id}")),
            ("user_id", format!("eq.{}", session.owner())),
        ])?;
        let request = self
            .http_client
            .delete(url)
            .header(PREFER_HEADER, RETURN_REPRESENTATION);
        let response = Self::send(self.authorize(request, Some(session))?).await?;

        let rows: Vec<Transaction> = response.json().await?;

        match rows.is_empty() {
            true => Err(Error::DeleteMissingTransaction),
            false => Ok(()),
        }
    }
}
