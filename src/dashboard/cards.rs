//! Summary cards for the balance, income and expense totals.

use maud::{Markup, html};

use crate::{
    html::{CARD_STYLE, format_currency},
    transaction::Totals,
};

/// Renders the three summary cards.
///
/// The balance is shown in green when it is zero or positive, and in red otherwise.
pub(super) fn summary_cards_view(totals: &Totals) -> Markup {
    let balance_style = if totals.balance >= 0.0 {
        "text-green-600 dark:text-green-400"
    } else {
        "text-red-600 dark:text-red-400"
    };

    html! {
        section
            id="summary-cards"
            class="w-full grid grid-cols-1 md:grid-cols-3 gap-4"
        {
            (summary_card("total-balance", "Total Balance", totals.balance, balance_style))
            (summary_card(
                "total-income",
                "Total Income",
                totals.income,
                "text-green-600 dark:text-green-400"
            ))
            (summary_card(
                "total-expenses",
                "Total Expenses",
                totals.expenses,
                "text-red-600 dark:text-red-400"
            ))
        }
    }
}

fn summary_card(id: &str, title: &str, amount: f64, amount_style: &str) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE)
        {
            h3 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }
            p
                data-amount
                class={ "text-2xl font-bold " (amount_style) }
            {
                (format_currency(amount))
            }
        }
    }
}
