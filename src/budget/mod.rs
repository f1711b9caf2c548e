//! Budget ledger - available balance and the expense acceptance check.
//!
//! # Key Concepts
//! - Balance: monthly budget minus the sum of recorded expense amounts
//! - Policy: what a new expense is compared against (full budget or what is left)
//! - Record: check-and-commit of a new expense in one store transaction

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::Expense;
use crate::store::{InsertOutcome, SpendingTotals, Store};

/// What a proposed expense amount is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetPolicy {
    /// Accept if `amount <= monthly budget`.
    #[default]
    MonthlyBudget,
    /// Accept if `amount <= monthly budget - total spent`.
    RemainingBalance,
}

impl BudgetPolicy {
    /// Upper bound for a new expense given the current totals.
    pub fn limit(&self, totals: &SpendingTotals) -> Decimal {
        match self {
            Self::MonthlyBudget => totals.monthly_budget,
            Self::RemainingBalance => totals.monthly_budget.saturating_sub(totals.total_spent),
        }
    }

    /// The amount must be within the limit and keep the running total
    /// representable.
    pub fn accepts(&self, totals: &SpendingTotals, amount: Decimal) -> bool {
        amount <= self.limit(totals) && totals.total_spent.checked_add(amount).is_some()
    }
}

impl FromStr for BudgetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "monthly_budget" => Ok(Self::MonthlyBudget),
            "remaining" | "remaining_balance" => Ok(Self::RemainingBalance),
            other => Err(format!(
                "unknown budget policy '{}', expected 'monthly' or 'remaining'",
                other
            )),
        }
    }
}

impl fmt::Display for BudgetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MonthlyBudget => write!(f, "monthly"),
            Self::RemainingBalance => write!(f, "remaining"),
        }
    }
}

/// A user's balance. `available` goes negative if the budget was lowered
/// below what has already been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub available: Decimal,
    pub total_spent: Decimal,
    pub budget: Decimal,
}

impl From<SpendingTotals> for Balance {
    fn from(totals: SpendingTotals) -> Self {
        Self {
            available: totals.monthly_budget.saturating_sub(totals.total_spent),
            total_spent: totals.total_spent,
            budget: totals.monthly_budget,
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    store: Store,
    policy: BudgetPolicy,
}

impl Ledger {
    pub fn new(store: Store, policy: BudgetPolicy) -> Self {
        Self { store, policy }
    }

    fn totals(&self, user_id: Uuid) -> ServiceResult<SpendingTotals> {
        self.store
            .spending_totals(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub fn remaining_balance(&self, user_id: Uuid) -> ServiceResult<Balance> {
        self.totals(user_id).map(Balance::from)
    }

    pub fn can_accept(&self, user_id: Uuid, amount: Decimal) -> ServiceResult<bool> {
        let totals = self.totals(user_id)?;
        Ok(self.policy.accepts(&totals, amount))
    }

    /// Check that replacing `old` with `new` in the user's total keeps it
    /// representable. Edits are not held to the budget.
    pub fn check_adjustment(&self, user_id: Uuid, old: Decimal, new: Decimal) -> ServiceResult<()> {
        let totals = self.totals(user_id)?;
        totals
            .total_spent
            .checked_sub(old)
            .and_then(|rest| rest.checked_add(new))
            .map(|_| ())
            .ok_or_else(|| ServiceError::validation("Amount is too large"))
    }

    /// Check `expense` against the owner's budget and persist it if accepted.
    pub fn record(&self, expense: &Expense) -> ServiceResult<()> {
        let policy = self.policy;
        match self
            .store
            .insert_expense_if(expense, |totals| policy.accepts(totals, expense.amount))?
        {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::UserMissing => Err(ServiceError::NotFound("User")),
            InsertOutcome::Rejected(totals) => {
                tracing::info!(
                    user_id = %expense.user_id,
                    amount = %expense.amount,
                    policy = %policy,
                    "Expense rejected by budget check"
                );
                Err(ServiceError::BudgetExceeded {
                    amount: expense.amount,
                    limit: policy.limit(&totals),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Category;
    use crate::testing::{sample_expense, sample_user};
    use rust_decimal_macros::dec;

    fn ledger_with_user(policy: BudgetPolicy, budget: Decimal) -> (Ledger, Store, Uuid) {
        let store = Store::open_in_memory().unwrap();
        let user = sample_user("asha", budget);
        store.insert_user(&user).unwrap();
        (Ledger::new(store.clone(), policy), store, user.id)
    }

    #[test]
    fn test_balance_with_no_expenses() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        let balance = ledger.remaining_balance(user_id).unwrap();
        assert_eq!(
            balance,
            Balance {
                available: dec!(1000),
                total_spent: Decimal::ZERO,
                budget: dec!(1000),
            }
        );
    }

    #[test]
    fn test_balance_is_budget_minus_sum() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        for amount in [dec!(200), dec!(99.99), dec!(0.01)] {
            let expense = sample_expense(user_id, "x", amount, Category::Food);
            ledger.record(&expense).unwrap();
        }
        let balance = ledger.remaining_balance(user_id).unwrap();
        assert_eq!(balance.total_spent, dec!(300));
        assert_eq!(balance.available, dec!(700));
    }

    #[test]
    fn test_balance_can_go_negative() {
        let (ledger, store, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        ledger
            .record(&sample_expense(user_id, "rent", dec!(800), Category::Bills))
            .unwrap();
        store.update_user_budget(user_id, dec!(500)).unwrap();

        assert_eq!(ledger.remaining_balance(user_id).unwrap().available, dec!(-300));
    }

    #[test]
    fn test_monthly_policy_compares_full_budget() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        ledger
            .record(&sample_expense(user_id, "a", dec!(800), Category::Food))
            .unwrap();

        // 800 already spent, but the monthly policy only looks at the budget
        assert!(ledger.can_accept(user_id, dec!(1000)).unwrap());
        assert!(!ledger.can_accept(user_id, dec!(1000.01)).unwrap());
        ledger
            .record(&sample_expense(user_id, "b", dec!(900), Category::Food))
            .unwrap();
    }

    #[test]
    fn test_remaining_policy_compares_available() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::RemainingBalance, dec!(1000));
        ledger
            .record(&sample_expense(user_id, "a", dec!(800), Category::Food))
            .unwrap();

        assert!(ledger.can_accept(user_id, dec!(200)).unwrap());
        assert!(!ledger.can_accept(user_id, dec!(201)).unwrap());

        let err = ledger
            .record(&sample_expense(user_id, "b", dec!(201), Category::Food))
            .unwrap_err();
        match err {
            ServiceError::BudgetExceeded { amount, limit } => {
                assert_eq!(amount, dec!(201));
                assert_eq!(limit, dec!(200));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ledger.remaining_balance(user_id).unwrap().available, dec!(200));
    }

    #[test]
    fn test_rejected_record_leaves_balance_unchanged() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        ledger
            .record(&sample_expense(user_id, "200 paneer tikka", dec!(200), Category::Food))
            .unwrap();

        let err = ledger
            .record(&sample_expense(user_id, "laptop", dec!(1500), Category::Gadgets))
            .unwrap_err();
        assert!(matches!(err, ServiceError::BudgetExceeded { .. }));
        assert_eq!(ledger.remaining_balance(user_id).unwrap().available, dec!(800));
    }

    #[test]
    fn test_concurrent_records_serialize() {
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::RemainingBalance, dec!(1000));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let expense =
                        sample_expense(user_id, &format!("item {}", i), dec!(300), Category::Food);
                    ledger.record(&expense).is_ok()
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 3);
        assert_eq!(ledger.remaining_balance(user_id).unwrap().total_spent, dec!(900));
    }

    #[test]
    fn test_total_beyond_decimal_range_rejected() {
        let huge = dec!(50000000000000000000000000000);
        let (ledger, _, user_id) = ledger_with_user(BudgetPolicy::MonthlyBudget, huge);
        ledger
            .record(&sample_expense(user_id, "yacht", huge, Category::Travel))
            .unwrap();

        // Within the monthly budget, but the total would not fit in a Decimal
        let err = ledger
            .record(&sample_expense(user_id, "island", huge, Category::Travel))
            .unwrap_err();
        assert!(matches!(err, ServiceError::BudgetExceeded { .. }));
        assert!(!ledger.can_accept(user_id, huge).unwrap());

        let balance = ledger.remaining_balance(user_id).unwrap();
        assert_eq!(balance.total_spent, huge);
        assert_eq!(balance.available, Decimal::ZERO);

        assert!(matches!(
            ledger.check_adjustment(user_id, dec!(0), huge),
            Err(ServiceError::Validation(_))
        ));
        ledger.check_adjustment(user_id, huge, dec!(1)).unwrap();
    }

    #[test]
    fn test_unknown_user() {
        let (ledger, _, _) = ledger_with_user(BudgetPolicy::MonthlyBudget, dec!(1000));
        let stranger = Uuid::new_v4();

        assert!(matches!(
            ledger.remaining_balance(stranger),
            Err(ServiceError::NotFound("User"))
        ));
        assert!(matches!(
            ledger.can_accept(stranger, dec!(1)),
            Err(ServiceError::NotFound("User"))
        ));
        let err = ledger
            .record(&sample_expense(stranger, "tea", dec!(1), Category::Food))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("User")));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("monthly".parse::<BudgetPolicy>().unwrap(), BudgetPolicy::MonthlyBudget);
        assert_eq!(
            " Remaining ".parse::<BudgetPolicy>().unwrap(),
            BudgetPolicy::RemainingBalance
        );
        assert!("weekly".parse::<BudgetPolicy>().is_err());
    }
}
