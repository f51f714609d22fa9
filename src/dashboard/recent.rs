//! The list of the most recently recorded transactions.

use maud::{Markup, html};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    endpoints::{self, format_endpoint},
    html::{BUTTON_DELETE_STYLE, CARD_STYLE, format_currency},
    transaction::{Transaction, TransactionKind},
};

/// How many transactions the list shows.
pub(super) const RECENT_TRANSACTION_COUNT: usize = 10;

/// The max number of graphemes to display in a description before truncating
/// and displaying ellipses.
const MAX_DESCRIPTION_GRAPHEMES: usize = 48;

pub(super) const EMPTY_STATE_MESSAGE: &str =
    "No transactions yet. Add your first transaction above!";

/// Renders the recent transactions, or a prompt to add one if there are none.
///
/// `transactions` should already be limited to [RECENT_TRANSACTION_COUNT] rows.
pub(super) fn recent_transactions_view(transactions: &[Transaction]) -> Markup {
    html! {
        section id="recent-transactions" class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { "Recent Transactions" }

            @if transactions.is_empty() {
                p class="text-center py-8 text-gray-500 dark:text-gray-400"
                {
                    (EMPTY_STATE_MESSAGE)
                }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for transaction in transactions {
                        (transaction_row(transaction))
                    }
                }
            }
        }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let (badge_style, amount_style, sign) = match transaction.kind {
        TransactionKind::Income => (
            "bg-green-100 text-green-800 dark:bg-green-900 dark:text-green-300",
            "text-green-600 dark:text-green-400",
            "+",
        ),
        TransactionKind::Expense => (
            "bg-red-100 text-red-800 dark:bg-red-900 dark:text-red-300",
            "text-red-600 dark:text-red-400",
            "-",
        ),
    };
    let (description, full_description) = format_description(&transaction.description);
    let delete_url = format_endpoint(endpoints::DELETE_TRANSACTION, &transaction.id);

    html! {
        li
            data-transaction-id=(transaction.id)
            class="flex items-center justify-between gap-4 py-3"
        {
            div class="flex flex-col gap-1 min-w-0"
            {
                div class="flex items-center gap-2"
                {
                    span class={ "px-2 py-0.5 rounded text-xs font-medium " (badge_style) }
                    {
                        (transaction.kind)
                    }

                    span class="font-medium" { (transaction.category) }
                }

                @if !description.is_empty() {
                    p
                        class="text-sm text-gray-600 dark:text-gray-400 truncate"
                        title=[full_description]
                    {
                        (description)
                    }
                }

                time
                    datetime=(transaction.date)
                    class="text-xs text-gray-500 dark:text-gray-400"
                {
                    (transaction.date)
                }
            }

            div class="flex items-center gap-4 shrink-0"
            {
                span class={ "font-semibold " (amount_style) }
                {
                    (sign) (format_currency(transaction.amount))
                }

                button
                    type="button"
                    hx-delete=(delete_url)
                    hx-target="#dashboard-content"
                    hx-swap="outerHTML"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }
        }
    }
}

fn format_description(description: &str) -> (String, Option<&str>) {
    let description_length = description.graphemes(true).count();

    if description_length <= MAX_DESCRIPTION_GRAPHEMES {
        (description.to_owned(), None)
    } else {
        let truncated: String = description
            .graphemes(true)
            .take(MAX_DESCRIPTION_GRAPHEMES - 3)
            .collect();
        (truncated + "...", Some(description))
    }
}
