//! Expense tracker backend.
//!
//! Users keep a monthly budget and record expenses described in free text.
//! Each description is sent to an LLM which extracts an amount and a
//! spending category; the result is checked against the user's budget and
//! persisted.
//!
//! # Modules
//! - `classifier`: free text to `(amount, category)`
//! - `budget`: available balance and the acceptance check
//! - `expenses`: expense records
//! - `accounts`: users, passwords and identity tokens
//! - `api`: HTTP surface

pub mod accounts;
pub mod api;
pub mod budget;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod expenses;
pub mod llm;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
