//! The form for recording a transaction.

use maud::{Markup, html};
use time::Date;

use crate::{
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::TransactionKind,
};

/// The options for the category select, for transactions of `kind`.
///
/// The first option is an empty placeholder so that no category is chosen
/// until the user picks one.
pub fn category_options(kind: TransactionKind) -> Markup {
    html! {
        option value="" disabled selected { "Select category" }

        @for category in kind.categories() {
            option value=(category) { (category) }
        }
    }
}

/// Renders the transaction form with its default values.
///
/// The form starts as an expense dated `today` with no amount, category or
/// description. Changing the type reloads the category options, which also
/// clears the chosen category. The submit button stays enabled while a
/// request is pending, so a double submit sends two requests.
pub(super) fn transaction_form_view(today: Date) -> Markup {
    let default_kind = TransactionKind::default();

    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { "Add Transaction" }

            form
                id="transaction-form"
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target="#dashboard-content"
                hx-swap="outerHTML"
                class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-5 gap-4 items-end"
            {
                div
                {
                    label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                    select
                        name="kind"
                        id="kind"
                        required
                        hx-get=(endpoints::CATEGORIES_API)
                        hx-trigger="change"
                        hx-target="#category"
                        hx-swap="innerHTML"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for kind in [TransactionKind::Income, TransactionKind::Expense] {
                            option value=(kind) selected[kind == default_kind] {
                                @match kind {
                                    TransactionKind::Income => "Income",
                                    TransactionKind::Expense => "Expense",
                                }
                            }
                        }
                    }
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    input
                        name="amount"
                        id="amount"
                        type="number"
                        step="0.01"
                        min="0"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                    select
                        name="category"
                        id="category"
                        required
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        (category_options(default_kind))
                    }
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    input
                        name="description"
                        id="description"
                        type="text"
                        placeholder="Optional description"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                    input
                        name="date"
                        id="date"
                        type="date"
                        value=(today)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div class="md:col-span-2 lg:col-span-5"
                {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Transaction" }
                }
            }
        }
    }
}
