use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    decode_decimal, decode_time, decode_uuid, encode_time, is_unique_violation, Store, StoreError,
};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, monthly_budget, password_hash, created_at";

type UserRow = (String, String, String, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_user((id, name, budget, password_hash, created_at): UserRow) -> Result<User, StoreError> {
    Ok(User {
        id: decode_uuid("users.id", id)?,
        name,
        monthly_budget: decode_decimal("users.monthly_budget", budget)?,
        password_hash,
        created_at: decode_time(created_at)?,
    })
}

impl Store {
    /// Insert a new user. A taken name yields [`StoreError::Duplicate`].
    pub fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (id, name, monthly_budget, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.name,
                user.monthly_budget.to_string(),
                user.password_hash,
                encode_time(&user.created_at),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("user name '{}'", user.name))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    pub fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.to_string()],
                read_row,
            )
            .optional()?;
        row.map(into_user).transpose()
    }

    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE name = ?1", USER_COLUMNS),
                params![name],
                read_row,
            )
            .optional()?;
        row.map(into_user).transpose()
    }

    pub fn user_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.lock();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Returns `false` if no such user exists.
    pub fn update_user_budget(
        &self,
        id: Uuid,
        monthly_budget: Decimal,
    ) -> Result<bool, StoreError> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE users SET monthly_budget = ?1 WHERE id = ?2",
            params![monthly_budget.to_string(), id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a user; owned expenses go with it. Returns `false` if no such
    /// user exists.
    pub fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}
