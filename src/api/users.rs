//! Handlers for the authenticated user's own account.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json, State};
use axum::http::StatusCode;

use super::auth::AuthUser;
use super::types::{json_body, reply, reply_empty, ApiResult, BudgetRequest};
use crate::context::ServiceContext;
use crate::error::ServiceError;

pub async fn me(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let user = ctx.accounts.get_by_id(user_id)?;
    Ok(reply(StatusCode::OK, "User retrieved successfully", user))
}

pub async fn delete_me(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    ctx.accounts.delete(user_id)?;
    Ok(reply_empty("User deleted successfully"))
}

pub async fn get_budget(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let budget = ctx.accounts.get_budget(user_id)?;
    Ok(reply(
        StatusCode::OK,
        "Budget retrieved successfully",
        serde_json::json!({ "monthlyBudget": budget }),
    ))
}

pub async fn update_budget(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<BudgetRequest>, JsonRejection>,
) -> ApiResult {
    let monthly_budget = json_body(payload)?
        .monthly_budget
        .ok_or_else(|| ServiceError::validation("monthlyBudget is required"))?;
    let user = ctx.accounts.update_budget(user_id, monthly_budget)?;
    Ok(reply(StatusCode::OK, "Budget updated successfully", user))
}

pub async fn balance(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let balance = ctx.ledger.remaining_balance(user_id)?;
    Ok(reply(StatusCode::OK, "Balance retrieved successfully", balance))
}
