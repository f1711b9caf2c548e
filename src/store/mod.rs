//! SQLite-backed record store for users and expenses.
//!
//! A single connection sits behind a mutex. Every method takes the lock for
//! the duration of one statement (or one transaction) and never across an
//! `.await`, so callers can use the store from async code directly.

mod expenses;
mod schema;
mod users;

pub use expenses::InsertOutcome;

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sum of column {0} is out of range")]
    Overflow(&'static str),

    #[error("Corrupt value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("Unique constraint violated: {0}")]
    Duplicate(String),
}

/// Running totals for one user, read inside a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendingTotals {
    pub monthly_budget: Decimal,
    pub total_spent: Decimal,
}

/// Handle to the database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self, StoreError> {
        migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A panic while holding the lock leaves no open transaction behind
    /// (rusqlite rolls back on drop), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering poisoned database lock");
            PoisonError::into_inner(poisoned)
        })
    }
}

fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let has_version_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !has_version_table {
        let tx = conn.transaction()?;
        tx.execute_batch(schema::SCHEMA_V1)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![schema::CURRENT_VERSION],
        )?;
        tx.commit()?;
        tracing::info!(version = schema::CURRENT_VERSION, "Initialized database schema");
        return Ok(());
    }

    let current: i32 = conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })?;

    for &(from_version, sql) in schema::MIGRATIONS {
        if current <= from_version {
            conn.execute_batch(sql)?;
        }
    }

    if current < schema::CURRENT_VERSION {
        conn.execute(
            "UPDATE schema_version SET version = ?1",
            params![schema::CURRENT_VERSION],
        )?;
        tracing::info!(
            from = current,
            to = schema::CURRENT_VERSION,
            "Migrated database schema"
        );
    }

    Ok(())
}

// Column codecs

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column: "created_at",
            value,
        })
}

fn decode_decimal(column: &'static str, value: String) -> Result<Decimal, StoreError> {
    Decimal::from_str(&value).map_err(|_| StoreError::Corrupt { column, value })
}

fn decode_uuid(column: &'static str, value: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&value).map_err(|_| StoreError::Corrupt { column, value })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
