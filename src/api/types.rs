//! Request bodies and the response envelope.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, ServiceError, ServiceResult};

/// Envelope wrapped around every JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Successful response carrying `data`.
pub fn reply<T: Serialize>(code: StatusCode, message: &str, data: T) -> Response {
    let body = ApiResponse {
        status: true,
        message: message.to_string(),
        data: Some(data),
    };
    (code, Json(body)).into_response()
}

/// Successful response with no payload.
pub fn reply_empty(message: &str) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        status: true,
        message: message.to_string(),
        data: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub type ApiResult = Result<Response, ServiceError>;

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::BudgetExceeded => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Classification => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());
        match &self {
            ServiceError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
            }
            ServiceError::Classification(e) => {
                tracing::warn!(error = %e, "Request failed: classifier unavailable");
            }
            _ => {}
        }

        let data = match &self {
            ServiceError::BudgetExceeded { amount, limit } => {
                Some(serde_json::json!({ "amount": amount, "limit": limit }))
            }
            _ => None,
        };
        let body = ApiResponse {
            status: false,
            message: self.public_message(),
            data,
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, turning a rejection into a validation failure.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ServiceError::Validation(format!("Invalid request body: {}", e.body_text())))
}

pub fn path_id(id: Result<Path<Uuid>, PathRejection>) -> ServiceResult<Uuid> {
    id.map(|Path(id)| id)
        .map_err(|_| ServiceError::validation("Invalid id"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub monthly_budget: Option<Decimal>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub monthly_budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
}
