//! Defines the core data models for transactions and the totals computed from them.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, auth::OwnerId};

// ============================================================================
// MODELS
// ============================================================================

/// The remote service's identifier for a transaction.
///
/// Identifiers are opaque strings assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap an identifier issued by the remote service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money that was earned.
    Income,
    /// Money that was spent.
    #[default]
    Expense,
}

/// The categories offered for income transactions.
pub const INCOME_CATEGORIES: [&str; 5] =
    ["Salary", "Freelance", "Investment", "Business", "Other Income"];

/// The categories offered for expense transactions.
pub const EXPENSE_CATEGORIES: [&str; 8] = [
    "Food",
    "Transportation",
    "Entertainment",
    "Shopping",
    "Bills",
    "Healthcare",
    "Education",
    "Other",
];

impl TransactionKind {
    /// The suggested categories for this kind of transaction.
    ///
    /// The list is a suggestion for the entry form only, stored transactions
    /// may carry any category.
    pub fn categories(self) -> &'static [&'static str] {
        match self {
            TransactionKind::Income => &INCOME_CATEGORIES,
            TransactionKind::Expense => &EXPENSE_CATEGORIES,
        }
    }

    /// The lowercase name used on the wire and in forms.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are created by the remote service, see [NewTransaction] for
/// the values a user submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: OwnerId,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The amount of money spent or earned, never negative.
    pub amount: f64,
    /// The category the transaction belongs to, e.g. "Food".
    pub category: String,
    /// A text description of what the transaction was for.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// When the remote service recorded the transaction.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The values a user submits to record a transaction.
///
/// The owner, ID and creation time are filled in by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// The category the transaction belongs to.
    pub category: String,
    /// A text description, may be empty.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
}

impl NewTransaction {
    /// Create a new transaction with an empty description.
    pub fn new(kind: TransactionKind, amount: f64, category: &str, date: Date) -> Self {
        Self {
            kind,
            amount,
            category: category.to_owned(),
            description: String::new(),
            date,
        }
    }

    /// Set the description of the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
}

// ============================================================================
// TOTALS
// ============================================================================

/// The sums shown on the summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    /// The sum of all income amounts.
    pub income: f64,
    /// The sum of all expense amounts.
    pub expenses: f64,
    /// Income minus expenses.
    pub balance: f64,
}

/// Sum the income and expense amounts of `transactions`.
pub fn totals(transactions: &[Transaction]) -> Totals {
    let (income, expenses) =
        transactions
            .iter()
            .fold((0.0, 0.0), |(income, expenses), transaction| {
                match transaction.kind {
                    TransactionKind::Income => (income + transaction.amount, expenses),
                    TransactionKind::Expense => (income, expenses + transaction.amount),
                }
            });

    Totals {
        income,
        expenses,
        balance: income - expenses,
    }
}


#[cfg(test)]
mod transaction_serde_tests {
    use time::macros::{date, datetime};

    use crate::{TransactionId, TransactionKind, auth::OwnerId};

    use super::Transaction;

    #[test]
    fn deserializes_remote_row() {
        let json = r#"{
            "id": "6f1c2b9e-2a8e-4b43-9a53-3e1f7c1d2b10",
            "user_id": "user-1",
            "type": "expense",
            "amount": 200.5,
            "category": "Food",
            "description": null,
            "date": "2024-03-05",
            "created_at": "2024-03-05T10:30:00.123456+00:00"
        }"#;

        let transaction: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(
            transaction.id,
            TransactionId::new("6f1c2b9e-2a8e-4b43-9a53-3e1f7c1d2b10")
        );
        assert_eq!(transaction.user_id, OwnerId::new("user-1"));
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.amount, 200.5);
        assert_eq!(transaction.description, "");
        assert_eq!(transaction.date, date!(2024 - 03 - 05));
        assert_eq!(
            transaction.created_at,
            datetime!(2024-03-05 10:30:00.123456 UTC)
        );
    }

    #[test]
    fn serializes_kind_as_type() {
        let transaction = Transaction {
            id: TransactionId::new("t1"),
            user_id: OwnerId::new("user-1"),
            kind: TransactionKind::Income,
            amount: 1000.0,
            category: "Salary".to_owned(),
            description: "March".to_owned(),
            date: date!(2024 - 03 - 01),
            created_at: datetime!(2024-03-01 09:00 UTC),
        };

        let json = serde_json::to_value(&transaction).unwrap();

        assert_eq!(json["type"], "income");
        assert_eq!(json["date"], "2024-03-01");
    }
}
