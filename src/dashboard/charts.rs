//! Chart generation and rendering for the dashboard.
//!
//! This module creates ECharts visualizations of the cached transactions:
//! - **Income vs Expenses**: the current income and expense totals side by side
//! - **Expense Categories**: a pie of spending per suggested expense category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with its HTML container and the JavaScript that initializes it.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisType, ItemStyle, JsFunction, Tooltip, Trigger},
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::aggregation::{comparison_rows, expense_breakdown},
    html::CARD_STYLE,
    transaction::Transaction,
};

const INCOME_COLOR: &str = "#10b981";
const EXPENSE_COLOR: &str = "#ef4444";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Creates the income vs. expenses and the expense category charts.
pub(super) fn build_dashboard_charts(transactions: &[Transaction]) -> [DashboardChart; 2] {
    [
        DashboardChart {
            id: "income-expense-chart",
            options: income_expense_chart(transactions).to_string(),
        },
        DashboardChart {
            id: "expense-categories-chart",
            options: expense_categories_chart(transactions).to_string(),
        },
    ]
}

/// Renders the chart containers followed by the script that draws them.
///
/// The script runs as soon as htmx swaps the markup into the page.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto"
        {
            div class="grid grid-cols-1 lg:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div class=(CARD_STYLE)
                    {
                        div
                            id=(chart.id)
                            class="min-h-[300px]"
                        {}
                    }
                }
            }

            script { (charts_script(charts)) }
        }
    )
}

/// Draws each chart, replacing the chart drawn into the previous dashboard
/// content.
///
/// The dashboard content is swapped on every change, so instances are kept in
/// `window.dashboardCharts` by chart ID and the old instance is disposed before
/// a new one is created. A single resize listener serves all charts.
fn charts_script(charts: &[DashboardChart]) -> PreEscaped<String> {
    let draw_charts = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom || typeof echarts === 'undefined') {{
                        return;
                    }}
                    const previous = window.dashboardCharts["{0}"];
                    if (previous && previous.getDom() !== chartDom) {{
                        previous.dispose();
                    }}
                    const chart = echarts.getInstanceByDom(chartDom) || echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option, true);
                    window.dashboardCharts["{0}"] = chart;
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let script_content = format!(
        r#"window.dashboardCharts = window.dashboardCharts || {{}};
        if (!window.dashboardChartsResize) {{
            window.dashboardChartsResize = function() {{
                Object.values(window.dashboardCharts).forEach(function(chart) {{
                    chart.resize();
                }});
            }};
            window.addEventListener('resize', window.dashboardChartsResize);
        }}
        {draw_charts}"#
    );

    PreEscaped(script_content)
}

pub(super) fn income_expense_chart(transactions: &[Transaction]) -> Chart {
    let rows = comparison_rows(transactions);
    let labels: Vec<&str> = rows.iter().map(|(label, _)| *label).collect();
    let income: Vec<f64> = rows.iter().map(|(_, totals)| totals.income).collect();
    let expenses: Vec<f64> = rows.iter().map(|(_, totals)| totals.expenses).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Income vs Expenses")
                .subtext("Monthly comparison"),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom(0))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom(40)
                .top(70)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Income")
                .item_style(ItemStyle::new().color(INCOME_COLOR))
                .data(income),
        )
        .series(
            Bar::new()
                .name("Expenses")
                .item_style(ItemStyle::new().color(EXPENSE_COLOR))
                .data(expenses),
        )
}

pub(super) fn expense_categories_chart(transactions: &[Transaction]) -> Chart {
    let data: Vec<(f64, &str)> = expense_breakdown(transactions)
        .into_iter()
        .map(|(category, total)| (total, category))
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Expense Categories")
                .subtext("Breakdown by category"),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom(0))
        .series(
            Pie::new()
                .name("Expenses")
                .radius(vec!["35%", "65%"])
                .center(vec!["50%", "55%"])
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR',
              maximumFractionDigits: 0
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}
