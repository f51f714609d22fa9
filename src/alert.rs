//! Transient success and error notices shown at the bottom of the page.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

use crate::html::alert_container;

/// A notice for the user about the outcome of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The operation succeeded.
    Success {
        /// The headline of the notice.
        message: String,
        /// Optional extra text shown under the headline.
        details: String,
    },
    /// The operation failed.
    Error {
        /// The headline of the notice.
        message: String,
        /// Optional extra text shown under the headline.
        details: String,
    },
}

impl Alert {
    /// Create a success alert.
    pub fn success(message: &str, details: &str) -> Self {
        Self::Success {
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Create an error alert.
    pub fn error(message: &str, details: &str) -> Self {
        Self::Error {
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Render just the alert box.
    pub fn into_html(self) -> Markup {
        let (message, details, container_style, icon) = match self {
            Alert::Success { message, details } => (
                message,
                details,
                "flex items-start gap-3 p-4 mb-4 rounded-lg shadow-lg text-green-800 \
                bg-green-50 dark:bg-gray-800 dark:text-green-400 border border-green-300 \
                dark:border-green-800",
                "✓",
            ),
            Alert::Error { message, details } => (
                message,
                details,
                "flex items-start gap-3 p-4 mb-4 rounded-lg shadow-lg text-red-800 \
                bg-red-50 dark:bg-gray-800 dark:text-red-400 border border-red-300 \
                dark:border-red-800",
                "!",
            ),
        };

        html! {
            div class=(container_style) role="alert"
            {
                span class="font-bold" aria-hidden="true" { (icon) }

                div class="flex-1"
                {
                    p class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p class="text-sm mt-1" { (details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="ms-auto text-lg leading-none"
                    onclick="this.parentElement.remove()"
                {
                    "×"
                }
            }
        }
    }

    /// Render the alert as an out-of-band swap into the page's alert container.
    ///
    /// Append this to any htmx response to show the alert alongside the main swap.
    pub fn into_oob_html(self) -> Markup {
        alert_container(Some(self.into_html()))
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_oob_html().into_string()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::test_utils::{assert_valid_html, parse_html_fragment};

    use super::Alert;

    #[tokio::test]
    async fn success_alert_swaps_into_alert_container() {
        let response = Alert::success("Transaction added successfully.", "").into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);

        let container = html
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("Could not find alert container");
        assert_eq!(container.value().attr("hx-swap-oob"), Some("true"));

        let text = container.text().collect::<String>();
        assert!(text.contains("Transaction added successfully."));
    }

    #[test]
    fn error_alert_includes_details() {
        let markup = Alert::error("Error", "Failed to add transaction: boom")
            .into_html()
            .into_string();

        assert!(markup.contains("Failed to add transaction: boom"));
        assert!(markup.contains("text-red-800"));
    }

    #[test]
    fn empty_details_are_not_rendered() {
        let markup = Alert::success("Saved", "").into_html().into_string();

        assert_eq!(markup.matches("<p").count(), 1);
    }
}
