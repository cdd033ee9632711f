//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT issuance/verification, the authorization
//! gate, and the credential flows that tie them to a `CredentialStore`.

pub mod credentials;
pub mod gate;
pub mod jwt;
pub mod password;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identity or wrong password. The two are never distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    DuplicateIdentity,

    /// Malformed or mis-signed token. Not recoverable by refreshing.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Correctly signed token past its expiry. Recoverable by refreshing.
    #[error("Token expired")]
    ExpiredToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
