//! Request and response types for the HTTP gateway.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    #[serde(rename = "_id", default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CaseIdRequest {
    #[serde(default)]
    pub case_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    #[serde(default)]
    pub case_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct RelevancyRequest {
    #[serde(default)]
    pub file_url: String,
    pub relevancy: f64,
}

// --- Responses ---

/// Shape of every API response. `object` is omitted on errors.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<T>,
}

pub type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

/// Successful response carrying `object`.
pub fn respond<T: Serialize>(status: StatusCode, message: &str, object: T) -> ApiResult<T> {
    Ok((
        status,
        Json(Envelope {
            message: message.to_string(),
            status: status.as_u16(),
            object: Some(object),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

/// An error response rendered as an object-less [`Envelope`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{entity} not found"),
        }
    }

    /// Backend failure. The detail is logged, the client sees `context`.
    pub fn internal(context: &str, detail: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, detail);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: context.to_string(),
        }
    }

    /// Map a domain error, using `context` as the message for backend failures.
    pub fn from_service(context: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(entity) => Self::not_found(entity),
            ServiceError::InvalidInput(message) => Self::bad_request(message),
            ServiceError::Unauthorized => Self {
                status: StatusCode::UNAUTHORIZED,
                message: "Passwords do not match".to_string(),
            },
            other => Self::internal(context, other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            message: self.message,
            status: self.status.as_u16(),
            object: None,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, turning any rejection into the standard 400 envelope.
pub fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::bad_request("Failed to read request body"))
        }
    }
}
