//! Dashboard module
//!
//! Provides the overview page with the summary cards, the transaction form,
//! charts and the most recent transactions.

mod aggregation;
mod cards;
mod charts;
mod form;
mod handlers;
mod recent;

pub use handlers::{
    DashboardState, get_category_options, get_dashboard_content, get_dashboard_page,
    refresh_transactions, render_dashboard_content,
};
