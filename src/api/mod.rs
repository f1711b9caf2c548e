//! HTTP API for the expense tracker.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/register` - Create an account
//! - `POST /api/auth/login` - Exchange credentials for a bearer token
//! - `GET|DELETE /api/users` - Current user
//! - `GET|PUT /api/users/budget` - Monthly budget
//! - `GET /api/users/balance` - Remaining balance
//! - `POST|GET /api/expenses` - Record an expense from free text / list them
//! - `POST /api/expenses/categorize` - Preview a classification
//! - `GET|PUT|DELETE /api/expenses/{id}` - Single expense
//!
//! Everything except health, register and login needs
//! `Authorization: Bearer <token>`.

mod auth;
mod expenses;
mod routes;
pub mod types;
mod users;

pub use routes::{router, serve};
pub use types::*;
