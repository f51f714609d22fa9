use axum::{body::Body, response::Response};
use scraper::Html;

pub(crate) async fn response_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).to_string()
}

/// Parse a full page, e.g. one rendered with [crate::html::base].
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&response_text(response).await)
}

/// Parse an htmx fragment, e.g. the dashboard content with an out-of-band alert.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&response_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}
