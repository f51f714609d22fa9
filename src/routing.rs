//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    dashboard::{
        get_category_options, get_dashboard_content, get_dashboard_page, refresh_transactions,
    },
    endpoints,
    entry::{get_entry_page, resolve_session},
    html::error_view,
    transaction::{create_transaction_endpoint, delete_transaction_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_entry_page))
        .route(endpoints::SESSION_API, get(resolve_session))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by HTMX and need to use the HX-REDIRECT header for auth redirects to work properly.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::DASHBOARD_CONTENT, get(get_dashboard_content))
            .route(endpoints::CATEGORIES_API, get(get_category_options))
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::REFRESH_TRANSACTIONS,
                post(refresh_transactions),
            )
            .route(
                endpoints::DELETE_TRANSACTION,
                delete(delete_transaction_endpoint),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// The page shown for routes and resources that do not exist.
pub fn get_404_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        error_view(
            "Not Found",
            "404",
            "Something's missing.",
            "Sorry, we can't find that page. You'll find lots to explore on the home page.",
        ),
    )
        .into_response()
}

async fn get_internal_server_error_page() -> Response {
    render_internal_server_error(
        "Sorry, something went wrong.",
        "Try again later or check the server logs",
    )
}

/// The internal server error page with a `description` of what went wrong
/// and a suggested `fix`.
pub fn render_internal_server_error(description: &str, fix: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_view("Internal Server Error", "500", description, fix),
    )
        .into_response()
}
