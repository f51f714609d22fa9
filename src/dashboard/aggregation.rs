//! Transaction data aggregation for the dashboard charts.

use crate::transaction::{Totals, Transaction, TransactionKind, totals};

/// The label of the only row in the income vs. expenses comparison.
pub(super) const CURRENT_PERIOD_LABEL: &str = "Current";

/// Sums expense amounts for each of the suggested expense categories.
///
/// Categories are returned in the order they are offered in the entry form.
/// Categories without any spending are left out, as are expenses filed under
/// a category that is not one of the suggestions.
pub(super) fn expense_breakdown(transactions: &[Transaction]) -> Vec<(&'static str, f64)> {
    TransactionKind::Expense
        .categories()
        .iter()
        .map(|&category| {
            let total = transactions
                .iter()
                .filter(|transaction| {
                    transaction.kind == TransactionKind::Expense
                        && transaction.category == category
                })
                .map(|transaction| transaction.amount)
                .sum::<f64>();

            (category, total)
        })
        .filter(|(_, total)| *total > 0.0)
        .collect()
}

/// The rows of the income vs. expenses chart.
///
/// There is a single row holding the current totals, or no rows at all when
/// there are no transactions.
pub(super) fn comparison_rows(transactions: &[Transaction]) -> Vec<(&'static str, Totals)> {
    if transactions.is_empty() {
        return Vec::new();
    }

    vec![(CURRENT_PERIOD_LABEL, totals(transactions))]
}
