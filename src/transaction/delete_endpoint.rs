use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::Response,
};

use crate::{
    AppState,
    auth::Session,
    dashboard::render_dashboard_content,
    transaction::{Operation, TransactionId, TransactionStore},
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    store: TransactionStore,
    local_timezone: String,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.transaction_store(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for deleting a transaction, responds with the updated
/// dashboard content and an alert.
///
/// The status code has to be 200 OK even when the deletion fails, otherwise
/// HTMX will not swap in the alert.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let alert = match state.store.remove(&session, &transaction_id).await {
        Ok(()) => Operation::Remove.success_alert(),
        Err(error) => Some(Operation::Remove.failure_alert(&error)),
    };

    render_dashboard_content(&state.store, &session, &state.local_timezone, alert)
}
