//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};

/// Bodies longer than this many bytes are truncated in the `info` level logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The form fields whose values never make it into the logs.
const REDACTED_FIELDS: [&str; 1] = ["password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            Bytes::new()
        }
    };
    let body_text = String::from_utf8_lossy(&body_bytes);

    if is_form_post(&parts) {
        let display_text = REDACTED_FIELDS
            .iter()
            .fold(body_text.to_string(), |text, field| redact_field(&text, field));
        log_request(&parts, &display_text);
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            Bytes::new()
        }
    };
    log_response(&parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn is_form_post(parts: &axum::http::request::Parts) -> bool {
    parts.method == Method::POST
        && parts.headers.get(CONTENT_TYPE)
            == Some(&HeaderValue::from_static(
                "application/x-www-form-urlencoded",
            ))
}

/// Replace the value of `field_name` in a URL encoded form body with asterisks.
fn redact_field(form_text: &str, field_name: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name == field_name => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// The longest prefix of `text` that fits in [LOG_BODY_LENGTH_LIMIT] bytes
/// without splitting a character.
fn truncate(text: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(text.len());

    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
