//! User accounts - registration, credentials and identity tokens.

mod password;
mod token;

pub use password::{PasswordError, PasswordHashing};
pub use token::{Claims, TokenError, TokenIssuer};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::User;
use crate::store::{Store, StoreError};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Outcome of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AccountManager {
    store: Store,
    hashing: PasswordHashing,
    tokens: TokenIssuer,
}

fn validate_budget(monthly_budget: Decimal) -> ServiceResult<()> {
    if monthly_budget < Decimal::ZERO {
        return Err(ServiceError::validation("Monthly budget must not be negative"));
    }
    Ok(())
}

impl AccountManager {
    pub fn new(store: Store, hashing: PasswordHashing, tokens: TokenIssuer) -> Self {
        hashing.warm_up();
        Self {
            store,
            hashing,
            tokens,
        }
    }

    pub fn register(
        &self,
        name: &str,
        monthly_budget: Decimal,
        password: &str,
    ) -> ServiceResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Name is required"));
        }
        if password.is_empty() {
            return Err(ServiceError::validation("Password is required"));
        }
        validate_budget(monthly_budget)?;

        if self.store.find_user_by_name(name)?.is_some() {
            return Err(ServiceError::Conflict(
                "User with this name already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            monthly_budget,
            password_hash: self.hashing.hash(password)?,
            created_at: Utc::now(),
        };

        match self.store.insert_user(&user) {
            Ok(()) => {}
            // Lost a race with a concurrent registration
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Conflict(
                    "User with this name already exists".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Verify credentials and issue a token.
    ///
    /// An unknown name and a wrong password produce the same error.
    pub fn login(&self, name: &str, password: &str) -> ServiceResult<Session> {
        if name.trim().is_empty() || password.is_empty() {
            return Err(ServiceError::validation("Name and password are required"));
        }

        let Some(user) = self.store.find_user_by_name(name.trim())? else {
            self.hashing.dummy_verify(password);
            tracing::warn!("Login failed");
            return Err(ServiceError::Auth(INVALID_CREDENTIALS.to_string()));
        };

        if !self.hashing.verify(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login failed");
            return Err(ServiceError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Session { token, user })
    }

    /// Resolve a bearer token to a live user id.
    pub fn authenticate(&self, token: &str) -> ServiceResult<Uuid> {
        let user_id = self.tokens.verify(token)?;
        if !self.store.user_exists(user_id)? {
            tracing::warn!(user_id = %user_id, "Token for unknown user");
            return Err(ServiceError::Auth("Access denied".to_string()));
        }
        Ok(user_id)
    }

    pub fn get_by_id(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub fn get_budget(&self, user_id: Uuid) -> ServiceResult<Decimal> {
        self.get_by_id(user_id).map(|u| u.monthly_budget)
    }

    pub fn update_budget(&self, user_id: Uuid, monthly_budget: Decimal) -> ServiceResult<User> {
        validate_budget(monthly_budget)?;
        if !self.store.update_user_budget(user_id, monthly_budget)? {
            return Err(ServiceError::NotFound("User"));
        }
        tracing::info!(
            user_id = %user_id,
            monthly_budget = %monthly_budget,
            "Updated monthly budget"
        );
        self.get_by_id(user_id)
    }

    /// Delete the user and every expense they own.
    pub fn delete(&self, user_id: Uuid) -> ServiceResult<()> {
        if !self.store.delete_user(user_id)? {
            return Err(ServiceError::NotFound("User"));
        }
        tracing::info!(user_id = %user_id, "Deleted user and their expenses");
        Ok(())
    }
}
