//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState,
    auth::Session,
    dashboard::render_dashboard_content,
    transaction::{NewTransaction, Operation, TransactionKind, TransactionStore},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The store holding the cached transactions.
    pub store: TransactionStore,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.transaction_store(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The amount as typed by the user.
    #[serde(default)]
    pub amount: String,
    /// The category, empty if the user did not pick one.
    #[serde(default)]
    pub category: String,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: String,
    /// The date when the transaction occurred, `None` if left blank.
    pub date: Option<Date>,
}

impl TransactionForm {
    /// Convert the form into a transaction, or `None` if a required field is
    /// missing or the amount is not a non-negative number.
    fn validate(&self) -> Option<NewTransaction> {
        let date = self.date?;
        let category = self.category.trim();

        if category.is_empty() {
            return None;
        }

        let amount: f64 = self.amount.trim().parse().ok()?;

        if !amount.is_finite() || amount < 0.0 {
            return None;
        }

        Some(
            NewTransaction::new(self.kind, amount, category, date)
                .description(&self.description),
        )
    }
}

/// A route handler for creating a new transaction.
///
/// Responds with the updated dashboard content and an alert saying whether the
/// transaction was added. An incomplete form is ignored with 204 No Content.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(session): Extension<Session>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let Some(transaction) = form.validate() else {
        tracing::debug!("ignoring incomplete transaction form: {form:?}");
        return StatusCode::NO_CONTENT.into_response();
    };

    let alert = match state.store.add(&session, &transaction).await {
        Ok(_) => Operation::Add.success_alert(),
        Err(error) => Some(Operation::Add.failure_alert(&error)),
    };

    render_dashboard_content(&state.store, &session, &state.local_timezone, alert)
}

#[cfg(test)]
mod tests {
    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        auth::Session,
        remote::{RemoteService, SqliteService},
        test_utils::{assert_status_ok, parse_html_fragment, sign_up_test_user, test_service},
        transaction::{NewTransaction, TransactionCaches, TransactionKind, TransactionStore},
    };

    use super::{CreateTransactionState, TransactionForm, create_transaction_endpoint};

    async fn get_state() -> (CreateTransactionState, SqliteService, Session) {
        let service = test_service();
        let session = sign_up_test_user(&service).await;
        let state = CreateTransactionState {
            store: TransactionStore::new(service.clone().into(), TransactionCaches::default()),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, service, session)
    }

    fn expense_form(amount: &str, category: &str) -> TransactionForm {
        TransactionForm {
            kind: TransactionKind::Expense,
            amount: amount.to_owned(),
            category: category.to_owned(),
            description: "Groceries".to_owned(),
            date: Some(date!(2024 - 01 - 15)),
        }
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let (state, service, session) = get_state().await;

        let response = create_transaction_endpoint(
            State(state.clone()),
            Extension(session.clone()),
            Form(expense_form("250.5", "Food")),
        )
        .await;

        assert_status_ok(&response);
        let stored = service.select_transactions(&session).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, 250.5);
        assert_eq!(stored[0].category, "Food");
        assert_eq!(stored[0].description, "Groceries");
        assert_eq!(stored[0].date, date!(2024 - 01 - 15));

        let cached = state.store.snapshot(session.owner()).unwrap();
        assert_eq!(cached.transactions(), stored.as_slice());

        let html = parse_html_fragment(response).await;
        let alert = html
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("no alert");
        assert!(
            alert
                .text()
                .collect::<String>()
                .contains("Transaction added successfully.")
        );
        let recent = html
            .select(&Selector::parse("#recent-transactions li").unwrap())
            .count();
        assert_eq!(recent, 1);
    }

    #[tokio::test]
    async fn new_transaction_is_shown_first() {
        let (state, _, session) = get_state().await;

        for category in ["Food", "Transport"] {
            create_transaction_endpoint(
                State(state.clone()),
                Extension(session.clone()),
                Form(expense_form("10", category)),
            )
            .await;
        }

        let cached = state.store.snapshot(session.owner()).unwrap();
        let categories: Vec<_> = cached
            .transactions()
            .iter()
            .map(|transaction| transaction.category.as_str())
            .collect();
        assert_eq!(categories, vec!["Transport", "Food"]);
    }

    #[tokio::test]
    async fn ignores_incomplete_form() {
        let (state, service, session) = get_state().await;

        for form in [
            expense_form("", "Food"),
            expense_form("abc", "Food"),
            expense_form("-5", "Food"),
            expense_form("NaN", "Food"),
            expense_form("inf", "Food"),
            expense_form("12", ""),
            expense_form("12", "   "),
            TransactionForm {
                date: None,
                ..expense_form("12", "Food")
            },
        ] {
            let response = create_transaction_endpoint(
                State(state.clone()),
                Extension(session.clone()),
                Form(form),
            )
            .await;

            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        assert!(service.select_transactions(&session).await.unwrap().is_empty());
    }

    #[test]
    fn parses_form_with_empty_fields() {
        let form: TransactionForm =
            serde_html_form::from_str("kind=expense&amount=&category=&date=2024-01-02").unwrap();

        assert_eq!(form.kind, TransactionKind::Expense);
        assert_eq!(form.amount, "");
        assert_eq!(form.description, "");
        assert_eq!(form.date, Some(date!(2024 - 01 - 02)));
        assert!(form.validate().is_none());
    }

    #[test]
    fn blank_date_is_invalid() {
        let form: TransactionForm =
            serde_html_form::from_str("kind=expense&amount=12&category=Food&date=").unwrap();

        assert_eq!(form.date, None);
        assert!(form.validate().is_none());
    }

    #[test]
    fn valid_form_trims_category() {
        let form: TransactionForm = serde_html_form::from_str(
            "kind=income&amount=+1000&category=+Salary+&description=June&date=2024-06-30",
        )
        .unwrap();

        let transaction = form.validate().expect("form should be valid");

        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.amount, 1000.0);
        assert_eq!(transaction.category, "Salary");
        assert_eq!(transaction.description, "June");
    }

    #[tokio::test]
    async fn create_on_unfetched_cache_shows_all_transactions() {
        let (state, service, session) = get_state().await;
        service
            .insert_transaction(
                &session,
                &NewTransaction::new(TransactionKind::Income, 1000.0, "Salary", date!(2024 - 01 - 01)),
            )
            .await
            .unwrap();

        let response = create_transaction_endpoint(
            State(state.clone()),
            Extension(session.clone()),
            Form(expense_form("200", "Food")),
        )
        .await;

        assert_status_ok(&response);
        let html = parse_html_fragment(response).await;
        let rows = html
            .select(&Selector::parse("#recent-transactions li[data-transaction-id]").unwrap())
            .count();
        assert_eq!(rows, 2);
        let balance: String = html
            .select(&Selector::parse("#total-balance [data-amount]").unwrap())
            .flat_map(|amount| amount.text())
            .collect();
        assert_eq!(balance.trim(), "₹800");
        assert_eq!(state.store.totals(session.owner()).unwrap().balance, 800.0);
    }

    #[tokio::test]
    async fn accepts_zero_amount() {
        let (state, service, session) = get_state().await;

        let response = create_transaction_endpoint(
            State(state),
            Extension(session.clone()),
            Form(expense_form("0", "Other Expense")),
        )
        .await;

        assert_status_ok(&response);
        assert_eq!(service.select_transactions(&session).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_insert_shows_alert_and_keeps_cache() {
        let (state, _, mut session) = get_state().await;
        session.access_token = "revoked".to_owned();

        let response = create_transaction_endpoint(
            State(state.clone()),
            Extension(session.clone()),
            Form(expense_form("12", "Food")),
        )
        .await;

        assert_status_ok(&response);
        assert!(
            state
                .store
                .snapshot(session.owner())
                .unwrap()
                .transactions()
                .is_empty()
        );
        let html = parse_html_fragment(response).await;
        let alert_text: String = html
            .select(&Selector::parse("#alert-container").unwrap())
            .flat_map(|alert| alert.text())
            .collect();
        assert!(
            alert_text.contains("Failed to add transaction: "),
            "got alert {alert_text:?}"
        );
    }
}
