//! Registration, login and the bearer-token middleware.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::types::{json_body, reply, ApiResult, LoginRequest, RegisterRequest};
use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};

/// Id of the caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(ctx): State<Arc<ServiceContext>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user_id = {
        let token = bearer_token(req.headers())
            .ok_or_else(|| ServiceError::Auth("Access denied. No token provided".to_string()))?;
        ctx.accounts.authenticate(token)?
    };
    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Run password hashing off the async workers.
async fn blocking<T, F>(f: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {}", e)))?
}

pub async fn register(
    State(ctx): State<Arc<ServiceContext>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(payload)?;
    let (Some(name), Some(monthly_budget), Some(password)) =
        (body.name, body.monthly_budget, body.password)
    else {
        return Err(ServiceError::validation(
            "name, monthlyBudget and password are required",
        ));
    };

    let accounts = ctx.accounts.clone();
    let user = blocking(move || accounts.register(&name, monthly_budget, &password)).await?;
    Ok(reply(StatusCode::CREATED, "User registered successfully", user))
}

pub async fn login(
    State(ctx): State<Arc<ServiceContext>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let body = json_body(payload)?;
    let (Some(name), Some(password)) = (body.name, body.password) else {
        return Err(ServiceError::validation("name and password are required"));
    };

    let accounts = ctx.accounts.clone();
    let session = blocking(move || accounts.login(&name, &password)).await?;
    Ok(reply(StatusCode::OK, "Login successful", session))
}
