//! Error types for placement-server
//!
//! Every non-2xx response uses the same envelope:
//! `{"success": false, "message": ..., "errors": [...], "data": null}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use placement_common::db::unique_violation_column;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed fields (400); `errors` names each offending field
    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or rejected admin credential (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Submission window closed (403)
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Duplicate identifier or ambiguous match (409)
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// placement-common error
    #[error(transparent)]
    Common(#[from] placement_common::Error),

    /// Raw database error
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: Vec<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Status code, public message and field list for this error
    ///
    /// Internal details are logged here and replaced with a generic message.
    fn parts(self) -> (StatusCode, String, Vec<String>) {
        use placement_common::Error as CommonError;

        match self {
            ApiError::Validation { message, errors } => (StatusCode::BAD_REQUEST, message, errors),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, Vec::new()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, Vec::new()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, Vec::new()),
            ApiError::Common(CommonError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            ApiError::Common(CommonError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg, Vec::new())
            }
            ApiError::Common(CommonError::Conflict(msg)) => (StatusCode::CONFLICT, msg, Vec::new()),
            ApiError::Common(CommonError::Duplicate { field }) => duplicate(field),
            ApiError::Common(CommonError::Database(err)) | ApiError::Database(err) => {
                match unique_violation_column(&err) {
                    Some(column) => duplicate(field_name(&column).to_string()),
                    None => internal(err.to_string()),
                }
            }
            ApiError::Common(err) => internal(err.to_string()),
            ApiError::Internal(msg) => internal(msg),
        }
    }
}

/// 409 naming the colliding field in both the message and `errors`
fn duplicate(field: String) -> (StatusCode, String, Vec<String>) {
    let message = placement_common::Error::Duplicate { field: field.clone() }.to_string();
    (StatusCode::CONFLICT, message, vec![field])
}

fn internal(detail: String) -> (StatusCode, String, Vec<String>) {
    error!("Internal error: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
        Vec::new(),
    )
}

/// JSON field name for a `student_profiles` column
pub fn field_name(column: &str) -> &str {
    match column {
        "registration_number" => "registrationNumber",
        "national_id" => "nationalId",
        "unique_id" => "uniqueId",
        other => other,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = self.parts();

        let body = Json(json!({
            "success": false,
            "message": message,
            "errors": errors,
            "data": null,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
