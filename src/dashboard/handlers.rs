//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - Route handlers for the dashboard page and its content fragment
//! - The handler that reloads the transactions on request
//! - The handler for the category options of the transaction form

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::Session,
    dashboard::{
        cards::summary_cards_view,
        charts::{build_dashboard_charts, charts_view},
        form::{category_options, transaction_form_view},
        recent::{RECENT_TRANSACTION_COUNT, recent_transactions_view},
    },
    endpoints,
    html::{BUTTON_SECONDARY_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, loading_view},
    navigation::NavBar,
    timezone::local_today,
    transaction::{Operation, TransactionCache, TransactionKind, TransactionStore},
};

const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5.6.0/dist/echarts.min.js";

/// The state needed for displaying the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The store holding the cached transactions.
    pub store: TransactionStore,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.transaction_store(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display the dashboard page.
///
/// If the user's transactions have not been fetched yet, the page shows a
/// loading message and fetches the dashboard content once it has loaded.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let cache = state.store.snapshot(session.owner())?;

    let content = if cache.is_seeded() {
        let today = local_today(&state.local_timezone)?;
        dashboard_content(&cache, today)
    } else {
        dashboard_loading_view()
    };

    Ok(dashboard_view(&session, &content).into_response())
}

/// Render the dashboard content, fetching the user's transactions first if
/// they have not been fetched yet.
///
/// A failed fetch is reported with an alert, and the content is rendered from
/// whatever was cached before.
pub async fn get_dashboard_content(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Response {
    let is_seeded = match state.store.snapshot(session.owner()) {
        Ok(cache) => cache.is_seeded(),
        Err(error) => return error.into_alert_response(),
    };

    let alert = if is_seeded {
        None
    } else {
        load_transactions(&state.store, &session).await
    };

    render_cached_content(&state.store, &session, &state.local_timezone, alert)
}

/// Fetch the user's transactions again and render the dashboard content.
pub async fn refresh_transactions(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Response {
    let alert = load_transactions(&state.store, &session).await;

    render_cached_content(&state.store, &session, &state.local_timezone, alert)
}

/// The query for the category options of a transaction type.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    /// The type of transaction to suggest categories for.
    pub kind: TransactionKind,
}

/// Render the category options for the selected transaction type.
pub async fn get_category_options(Query(query): Query<CategoryQuery>) -> Markup {
    category_options(query.kind)
}

async fn load_transactions(store: &TransactionStore, session: &Session) -> Option<Alert> {
    match store.load(session).await {
        Ok(()) => Operation::Load.success_alert(),
        Err(error) => Some(Operation::Load.failure_alert(&error)),
    }
}

/// Render the dashboard content after a change to the user's transactions,
/// followed by `alert` as an out-of-band swap.
///
/// If the cache could not be fetched, the loading view is rendered instead so
/// the browser fetches the full list rather than showing a partial one.
pub fn render_dashboard_content(
    store: &TransactionStore,
    session: &Session,
    local_timezone: &str,
    alert: Option<Alert>,
) -> Response {
    let cache = match store.snapshot(session.owner()) {
        Ok(cache) => cache,
        Err(error) => return error.into_alert_response(),
    };

    if !cache.is_seeded() {
        return with_alert(dashboard_loading_view(), alert).into_response();
    }

    render_content(&cache, local_timezone, alert)
}

/// Render the dashboard content from whatever is cached, even if the last
/// fetch failed.
fn render_cached_content(
    store: &TransactionStore,
    session: &Session,
    local_timezone: &str,
    alert: Option<Alert>,
) -> Response {
    match store.snapshot(session.owner()) {
        Ok(cache) => render_content(&cache, local_timezone, alert),
        Err(error) => error.into_alert_response(),
    }
}

fn render_content(cache: &TransactionCache, local_timezone: &str, alert: Option<Alert>) -> Response {
    let today = match local_today(local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    with_alert(dashboard_content(cache, today), alert).into_response()
}

fn with_alert(content: Markup, alert: Option<Alert>) -> Markup {
    html! {
        (content)

        @if let Some(alert) = alert {
            (alert.into_oob_html())
        }
    }
}

fn dashboard_view(session: &Session, content: &Markup) -> Markup {
    let nav_bar = NavBar::new(session.user.display_name()).into_html();

    let content = html!(
        (nav_bar)
        (content)
    );

    let scripts = [HeadElement::ScriptLink(ECHARTS_URL.to_owned())];

    base("Dashboard", &scripts, &content)
}

fn dashboard_loading_view() -> Markup {
    html!(
        div
            id="dashboard-content"
            hx-get=(endpoints::DASHBOARD_CONTENT)
            hx-trigger="load"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class=(PAGE_CONTAINER_STYLE)
        {
            (loading_view("Loading your finances..."))
        }
    )
}

fn dashboard_content(cache: &TransactionCache, today: Date) -> Markup {
    let charts = build_dashboard_charts(cache.transactions());

    html!(
        div
            id="dashboard-content"
            class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full flex justify-end"
            {
                button
                    type="button"
                    hx-post=(endpoints::REFRESH_TRANSACTIONS)
                    hx-target="#dashboard-content"
                    hx-swap="outerHTML"
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Refresh"
                }
            }

            (summary_cards_view(&cache.totals()))
            (transaction_form_view(today))
            (charts_view(&charts))
            (recent_transactions_view(cache.recent(RECENT_TRANSACTION_COUNT)))
        }
    )
}
