//! Error types for Lectern server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed in JSON error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthenticated = 2,
    Forbidden = 3,
    NotAuthorized = 4,
    DbFailure = 5,
    NoSuchEntity = 6,
    BadValue = 7,
    Duplicate = 8,
    RequestQuotaReached = 9,
    DuplicateRequest = 10,
    AlreadyIssued = 11,
    AlreadyReturned = 12,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Role check failed (authenticated but not privileged enough)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Ownership / possession check failed (file access, return-by-id)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Open request limit reached: {0}")]
    QuotaExceeded(String),

    #[error("Duplicate request: {0}")]
    DuplicateRequest(String),

    #[error("Already issued: {0}")]
    AlreadyIssued(String),

    #[error("Already returned: {0}")]
    AlreadyReturned(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Fold Postgres unique violations from the lifecycle backstop indexes
    /// into the matching domain error instead of a generic 500.
    pub fn from_unique_violation(err: sqlx::Error, fallback: AppError) -> AppError {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return fallback;
            }
        }
        AppError::Database(err)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone())
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchEntity, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::QuotaExceeded(msg) => {
                (StatusCode::CONFLICT, ErrorCode::RequestQuotaReached, msg.clone())
            }
            AppError::DuplicateRequest(msg) => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateRequest, msg.clone())
            }
            AppError::AlreadyIssued(msg) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyIssued, msg.clone())
            }
            AppError::AlreadyReturned(msg) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyReturned, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_map_to_conflict() {
        for err in [
            AppError::QuotaExceeded("q".into()),
            AppError::DuplicateRequest("d".into()),
            AppError::AlreadyIssued("i".into()),
            AppError::AlreadyReturned("r".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn role_and_ownership_failures_are_distinct_codes() {
        let forbidden = AppError::Forbidden("role".into()).into_response();
        let unauthorized = AppError::Unauthorized("owner".into()).into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(unauthorized.status(), StatusCode::FORBIDDEN);
        // Same visible status, distinct machine-readable codes.
        assert_ne!(ErrorCode::Forbidden as u32, ErrorCode::NotAuthorized as u32);
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let resp = AppError::Authentication("token absent".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
