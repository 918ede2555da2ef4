//! Error types for mathmap-server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mathmap_common::api::ApiAuthError;
use serde_json::json;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Hint attached to unexpected image-handling failures
pub const IMAGE_PROCESSING_HINT: &str = "图片处理失败，请确保上传了正确的图片格式";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Upload over the body limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Missing or rejected credentials (401)
    #[error("{0}")]
    Unauthorized(#[from] ApiAuthError),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// Uploaded image could not be read or recognized (500)
    #[error("{0}")]
    ImageProcessing(String),

    /// mathmap-common error
    #[error(transparent)]
    Common(#[from] mathmap_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Constraint violations are the caller's fault; everything else is ours
fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized(ApiAuthError::DatabaseError(_))
            | ApiError::Unauthorized(ApiAuthError::SigningError(_))
            | ApiError::Unauthorized(ApiAuthError::HashingError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::ImageProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Common(err) => match err {
                mathmap_common::Error::Database(db_err) => database_status(db_err),
                mathmap_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                mathmap_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                mathmap_common::Error::Token(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = match &self {
            ApiError::ImageProcessing(msg) => json!({
                "error": msg,
                "detail": IMAGE_PROCESSING_HINT,
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
