//! Expense records - creation through the classifier and the budget ledger,
//! plus direct reads, updates and deletes.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::budget::Ledger;
use crate::classifier::{Category, Classification, Classifier};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Expense, ExpenseChanges};
use crate::store::Store;

/// Fields a caller may change on an existing expense.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct ExpenseManager {
    store: Store,
    ledger: Ledger,
    classifier: Arc<dyn Classifier>,
}

fn require_description(description: &str) -> ServiceResult<&str> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ServiceError::validation("Description is required"));
    }
    Ok(description)
}

impl ExpenseManager {
    pub fn new(store: Store, ledger: Ledger, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            store,
            ledger,
            classifier,
        }
    }

    /// Classify `description`, check the amount against the owner's budget
    /// and persist the expense. Nothing is written on any failure.
    pub async fn create(&self, user_id: Uuid, description: &str) -> ServiceResult<Expense> {
        let description = require_description(description)?;
        if !self.store.user_exists(user_id)? {
            return Err(ServiceError::NotFound("User"));
        }

        let classification = self.classifier.categorize(description).await.map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Expense classification failed");
            ServiceError::from(e)
        })?;

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            description: description.to_string(),
            amount: classification.amount,
            category: classification.category,
            raw_category: classification.raw_category,
            created_at: Utc::now(),
        };
        self.ledger.record(&expense)?;

        tracing::info!(
            user_id = %user_id,
            expense_id = %expense.id,
            amount = %expense.amount,
            category = %expense.category,
            "Created expense"
        );
        Ok(expense)
    }

    /// Every expense of the user, newest first. Empty if there are none.
    pub fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Expense>> {
        if !self.store.user_exists(user_id)? {
            return Err(ServiceError::NotFound("User"));
        }
        Ok(self.store.list_expenses_for_user(user_id)?)
    }

    pub fn get_by_id(&self, expense_id: Uuid) -> ServiceResult<Expense> {
        self.store
            .find_expense(expense_id)?
            .ok_or(ServiceError::NotFound("Expense"))
    }

    /// Apply a direct edit. Bypasses the classifier and the budget check.
    pub fn update(&self, expense_id: Uuid, update: ExpenseUpdate) -> ServiceResult<Expense> {
        let changes = ExpenseChanges {
            amount: update.amount,
            category: match update.category {
                Some(label) => {
                    let label = label.trim().to_string();
                    let category = Category::from_label(&label).ok_or_else(|| {
                        ServiceError::Validation(format!("Unknown category '{}'", label))
                    })?;
                    Some((category, label))
                }
                None => None,
            },
        };
        if changes.is_empty() {
            return Err(ServiceError::validation(
                "At least one field (amount, category) is required",
            ));
        }

        let mut expense = self.get_by_id(expense_id)?;
        if let Some(amount) = changes.amount {
            if amount <= Decimal::ZERO {
                return Err(ServiceError::validation("Amount must be positive"));
            }
            self.ledger.check_adjustment(expense.user_id, expense.amount, amount)?;
        }
        changes.apply(&mut expense);
        if !self.store.update_expense(&expense)? {
            return Err(ServiceError::NotFound("Expense"));
        }

        tracing::info!(expense_id = %expense_id, "Updated expense");
        Ok(expense)
    }

    pub fn delete(&self, expense_id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_expense(expense_id)? {
            return Err(ServiceError::NotFound("Expense"));
        }
        tracing::info!(expense_id = %expense_id, "Deleted expense");
        Ok(())
    }

    /// Classify without persisting anything.
    pub async fn categorize_only(&self, description: &str) -> ServiceResult<Classification> {
        let description = require_description(description)?;
        Ok(self.classifier.categorize(description).await?)
    }
}
