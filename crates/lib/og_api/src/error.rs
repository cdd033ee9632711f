//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use og_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Generic message for every credential failure.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "duplicate_identity", m.as_str()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                INVALID_CREDENTIALS_MESSAGE,
            ),
            AppError::InvalidToken(m) => (StatusCode::UNAUTHORIZED, "invalid_token", m.as_str()),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", "Token expired"),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Service temporarily unavailable",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });

        let mut response = (status, body).into_response();
        if matches!(self, AppError::InvalidToken(_) | AppError::TokenExpired) {
            let challenge = format!("Bearer error=\"{error}\"");
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::DuplicateIdentity => AppError::Conflict("User already exists".into()),
            AuthError::InvalidToken(detail) => {
                debug!(%detail, "invalid token");
                AppError::InvalidToken("Invalid token".into())
            }
            AuthError::ExpiredToken => AppError::TokenExpired,
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Unavailable(msg) => AppError::Unavailable(msg),
            AuthError::ConfigurationError(msg) => {
                error!(%msg, "auth misconfiguration");
                AppError::Internal(msg)
            }
            AuthError::DbError(e) => {
                error!("database error: {e}");
                AppError::Internal(e.to_string())
            }
            AuthError::Internal(msg) => {
                error!(%msg, "internal auth error");
                AppError::Internal(msg)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), "request body rejected");
        AppError::Validation(rejection.body_text())
    }
}
