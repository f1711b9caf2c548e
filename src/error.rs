//! Service error taxonomy shared by every component.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::accounts::{PasswordError, TokenError};
use crate::classifier::ClassificationError;
use crate::store::StoreError;

/// Kind of a [`ServiceError`], used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Auth,
    BudgetExceeded,
    Classification,
    Internal,
}

/// Error returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique field is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Bad, missing or expired credential or token.
    #[error("{0}")]
    Auth(String),

    /// Proposed expense is larger than the user may accept.
    #[error("Expense amount {amount} exceeds the allowed limit of {limit}")]
    BudgetExceeded { amount: Decimal, limit: Decimal },

    /// The external categorizer failed.
    #[error("Failed to categorize expense: {0}")]
    Classification(#[from] ClassificationError),

    /// Anything unexpected; details are logged, never shown to callers.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Auth(_) => ErrorKind::Auth,
            Self::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            Self::Classification(_) => ErrorKind::Classification,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Message safe to show to an API caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Classification(_) => "Failed to categorize expense".to_string(),
            Self::BudgetExceeded { .. } => "Expense amount exceeds monthly budget".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(e) => Self::Internal(format!("token encoding failed: {}", e)),
            other => Self::Auth(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
