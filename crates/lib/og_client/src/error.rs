//! Client error types.

use thiserror::Error;

/// Failure of a single call to the auth API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server saw a well-formed token that has expired.
    #[error("token expired")]
    TokenExpired,

    /// The server refused the token outright (bad signature, unknown subject).
    #[error("token rejected")]
    TokenRejected,

    /// Any other non-2xx answer.
    #[error("{message} ({status} {code})")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failure reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no data directory available")]
    NoDataDir,

    #[error("session file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file format: {0}")]
    Format(#[from] serde_json::Error),
}

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("a login is already in flight")]
    Busy,

    /// The session was logged out while this call was in flight.
    #[error("session ended while the request was in flight")]
    LoggedOut,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
