use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    decode_decimal, decode_time, decode_uuid, encode_time, SpendingTotals, Store, StoreError,
};
use crate::classifier::Category;
use crate::models::Expense;

const EXPENSE_COLUMNS: &str =
    "id, user_id, description, amount, category, raw_category, created_at";

type ExpenseRow = (String, String, String, String, String, String, String);

/// Result of a guarded insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The guard refused; nothing was written.
    Rejected(SpendingTotals),
    /// The owning user does not exist.
    UserMissing,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_expense(
    (id, user_id, description, amount, category, raw_category, created_at): ExpenseRow,
) -> Result<Expense, StoreError> {
    let category = Category::from_label(&category).ok_or(StoreError::Corrupt {
        column: "expenses.category",
        value: category,
    })?;
    Ok(Expense {
        id: decode_uuid("expenses.id", id)?,
        user_id: decode_uuid("expenses.user_id", user_id)?,
        description,
        amount: decode_decimal("expenses.amount", amount)?,
        category,
        raw_category,
        created_at: decode_time(created_at)?,
    })
}

/// Budget and spend for `user_id`, or `None` if the user does not exist.
fn read_totals(conn: &Connection, user_id: Uuid) -> Result<Option<SpendingTotals>, StoreError> {
    let budget: Option<String> = conn
        .query_row(
            "SELECT monthly_budget FROM users WHERE id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(budget) = budget else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT amount FROM expenses WHERE user_id = ?1")?;
    let amounts = stmt.query_map(params![user_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut total_spent = Decimal::ZERO;
    for amount in amounts {
        total_spent = total_spent
            .checked_add(decode_decimal("expenses.amount", amount?)?)
            .ok_or(StoreError::Overflow("expenses.amount"))?;
    }

    Ok(Some(SpendingTotals {
        monthly_budget: decode_decimal("users.monthly_budget", budget)?,
        total_spent,
    }))
}

fn insert_row(conn: &Connection, expense: &Expense) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO expenses (id, user_id, description, amount, category, raw_category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            expense.id.to_string(),
            expense.user_id.to_string(),
            expense.description,
            expense.amount.to_string(),
            expense.category.as_str(),
            expense.raw_category,
            encode_time(&expense.created_at),
        ],
    )?;
    Ok(())
}

impl Store {
    /// Insert `expense` if `accept` approves the owner's current totals.
    ///
    /// The read and the write happen in one immediate transaction, so two
    /// concurrent inserts for the same user cannot both pass against a stale
    /// total.
    pub fn insert_expense_if<F>(
        &self,
        expense: &Expense,
        accept: F,
    ) -> Result<InsertOutcome, StoreError>
    where
        F: FnOnce(&SpendingTotals) -> bool,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(totals) = read_totals(&tx, expense.user_id)? else {
            return Ok(InsertOutcome::UserMissing);
        };
        if !accept(&totals) {
            return Ok(InsertOutcome::Rejected(totals));
        }

        insert_row(&tx, expense)?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn spending_totals(&self, user_id: Uuid) -> Result<Option<SpendingTotals>, StoreError> {
        let conn = self.lock();
        read_totals(&conn, user_id)
    }

    pub fn find_expense(&self, id: Uuid) -> Result<Option<Expense>, StoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM expenses WHERE id = ?1", EXPENSE_COLUMNS),
                params![id.to_string()],
                read_row,
            )
            .optional()?;
        row.map(into_expense).transpose()
    }

    /// All expenses of a user, newest first.
    pub fn list_expenses_for_user(&self, user_id: Uuid) -> Result<Vec<Expense>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            EXPENSE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], read_row)?;

        let mut expenses = Vec::new();
        for row in rows {
            expenses.push(into_expense(row?)?);
        }
        Ok(expenses)
    }

    /// Persist amount and category fields. Returns `false` if the expense
    /// does not exist.
    pub fn update_expense(&self, expense: &Expense) -> Result<bool, StoreError> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE expenses SET amount = ?1, category = ?2, raw_category = ?3 WHERE id = ?4",
            params![
                expense.amount.to_string(),
                expense.category.as_str(),
                expense.raw_category,
                expense.id.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Returns `false` if the expense does not exist.
    pub fn delete_expense(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
