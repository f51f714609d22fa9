//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

use std::fmt::Display;

/// The entry page which resolves the session and picks the log-in or dashboard view.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The dashboard fragment with the cards, form, charts and recent transactions.
pub const DASHBOARD_CONTENT: &str = "/dashboard/content";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route the entry page calls to resolve the current session.
pub const SESSION_API: &str = "/api/session";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route for the suggested categories of a transaction type.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route to create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to reload the transactions from the remote service.
pub const REFRESH_TRANSACTIONS: &str = "/api/transactions/refresh";
/// The route to delete a single transaction.
pub const DELETE_TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
