//! API server configuration.

use og_core::auth::AuthError;
use og_core::config::AuthConfig;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Default PostgreSQL connection URL.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/onlygames";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:5000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Token and credential settings.
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable       | Default                                  |
    /// |----------------|------------------------------------------|
    /// | `BIND_ADDR`    | `127.0.0.1:5000`                         |
    /// | `DATABASE_URL` | `postgres://localhost:5432/onlygames`    |
    ///
    /// plus everything [`AuthConfig::from_env`] reads. Fails when no
    /// signing secret is configured.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            auth: AuthConfig::from_env()?,
        })
    }
}
