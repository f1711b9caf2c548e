//! Expense handlers. Only the caller's own expenses are visible.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use super::auth::AuthUser;
use super::types::{
    json_body, path_id, reply, reply_empty, ApiResult, DescriptionRequest, UpdateExpenseRequest,
};
use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};
use crate::expenses::ExpenseUpdate;
use crate::models::Expense;

fn description(payload: Result<Json<DescriptionRequest>, JsonRejection>) -> ServiceResult<String> {
    json_body(payload)?
        .description
        .ok_or_else(|| ServiceError::validation("Description is required"))
}

/// Someone else's expense looks the same as a missing one.
fn owned_expense(ctx: &ServiceContext, user_id: Uuid, expense_id: Uuid) -> ServiceResult<Expense> {
    let expense = ctx.expenses.get_by_id(expense_id)?;
    if expense.user_id != user_id {
        return Err(ServiceError::NotFound("Expense"));
    }
    Ok(expense)
}

pub async fn create(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<DescriptionRequest>, JsonRejection>,
) -> ApiResult {
    let description = description(payload)?;
    let expense = ctx.expenses.create(user_id, &description).await?;
    Ok(reply(StatusCode::CREATED, "Expense created successfully", expense))
}

pub async fn list(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let expenses = ctx.expenses.list_for_user(user_id)?;
    Ok(reply(StatusCode::OK, "Expenses retrieved successfully", expenses))
}

pub async fn categorize(
    State(ctx): State<Arc<ServiceContext>>,
    payload: Result<Json<DescriptionRequest>, JsonRejection>,
) -> ApiResult {
    let description = description(payload)?;
    let classification = ctx.expenses.categorize_only(&description).await?;
    Ok(reply(StatusCode::OK, "Expense categorized successfully", classification))
}

pub async fn get(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let expense = owned_expense(&ctx, user_id, path_id(id)?)?;
    Ok(reply(StatusCode::OK, "Expense retrieved successfully", expense))
}

pub async fn update(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> ApiResult {
    let expense_id = path_id(id)?;
    let body = json_body(payload)?;
    owned_expense(&ctx, user_id, expense_id)?;

    let expense = ctx.expenses.update(
        expense_id,
        ExpenseUpdate {
            amount: body.amount,
            category: body.category,
        },
    )?;
    Ok(reply(StatusCode::OK, "Expense updated successfully", expense))
}

pub async fn delete(
    State(ctx): State<Arc<ServiceContext>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let expense_id = path_id(id)?;
    owned_expense(&ctx, user_id, expense_id)?;
    ctx.expenses.delete(expense_id)?;
    Ok(reply_empty("Expense deleted successfully"))
}
