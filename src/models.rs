//! Records persisted by the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::classifier::Category;

/// A registered user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub monthly_budget: Decimal,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A recorded expense.
///
/// `category` is the canonical label; `raw_category` is the label exactly as
/// the classifier (or a later manual edit) supplied it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub category: Category,
    pub raw_category: String,
    pub created_at: DateTime<Utc>,
}

/// Changes applied by a direct expense update.
#[derive(Debug, Clone, Default)]
pub struct ExpenseChanges {
    pub amount: Option<Decimal>,
    pub category: Option<(Category, String)>,
}

impl ExpenseChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.category.is_none()
    }

    /// Apply the changes, keeping unspecified fields.
    pub fn apply(self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some((category, raw)) = self.category {
            expense.category = category;
            expense.raw_category = raw;
        }
    }
}
