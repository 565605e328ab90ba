//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map every failure to a status code and JSON body
//! - Collect per-field validation messages
//!
//! # Design Decisions
//! - Authentication failures never say which part was wrong
//! - Database errors are logged in full and answered generically,
//!   except constraint violations which the caller can act on

use std::collections::BTreeMap;

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Field name used for errors not tied to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

/// Request failure, rendered as JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    /// Malformed request outside field validation, rendered as `{"error": ...}`.
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// Body could not be parsed as a JSON object.
    #[error("malformed body: {0}")]
    MalformedBody(String),

    #[error("authentication credentials were not provided")]
    NotAuthenticated,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// Token could not be decoded, is expired, or was revoked.
    #[error("token not valid")]
    InvalidToken,

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("request throttled")]
    Throttled { wait_secs: Option<u64> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The generic lookup miss.
    pub fn not_found() -> Self {
        ApiError::NotFound("Not found.")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotAuthenticated
            | ApiError::AuthenticationFailed(_)
            | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(e) => match e.as_database_error() {
                Some(db) if db.is_foreign_key_violation() => StatusCode::CONFLICT,
                Some(db) if db.is_unique_violation() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::MalformedBody(reason) => {
                json!({ "detail": format!("JSON parse error - {}", reason) })
            }
            ApiError::NotAuthenticated => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            ApiError::AuthenticationFailed(detail) => json!({ "detail": detail }),
            ApiError::InvalidToken => json!({
                "detail": "Token is invalid or expired",
                "code": "token_not_valid",
            }),
            ApiError::NotFound(detail) | ApiError::Conflict(detail) => json!({ "detail": detail }),
            ApiError::MethodNotAllowed(method) => {
                json!({ "detail": format!("Method \"{}\" not allowed.", method) })
            }
            ApiError::Throttled { wait_secs } => match wait_secs {
                Some(secs) => json!({
                    "detail": format!("Request was throttled. Expected available in {} seconds.", secs)
                }),
                None => json!({ "detail": "Request was throttled." }),
            },
            ApiError::Database(e) => match status {
                StatusCode::CONFLICT => json!({
                    "detail": "The operation would break a reference held by another record."
                }),
                StatusCode::BAD_REQUEST => json!(FieldErrors::single(
                    NON_FIELD_ERRORS,
                    "A record with this key already exists."
                )),
                _ => {
                    tracing::error!(error = %e, "Database error");
                    json!({ "detail": "A server error occurred." })
                }
            },
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                json!({ "detail": "A server error occurred." })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Fallback for unmatched paths.
pub async fn not_found_fallback() -> ApiError {
    ApiError::not_found()
}

/// Fallback for matched paths without a handler for the method.
pub async fn method_not_allowed_fallback(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
