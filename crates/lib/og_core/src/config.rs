//! Authentication configuration.

use chrono::Duration;

use crate::auth::AuthError;
use crate::auth::jwt::{
    DEFAULT_REFRESH_GRACE_SECS, DEFAULT_TOKEN_TTL_SECS, JwtSecret, TokenIssuer, TokenVerifier,
};
use crate::auth::password::DEFAULT_BCRYPT_COST;

/// Default bound on a single credential store call.
pub const DEFAULT_STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Settings shared by the token issuer, verifier and credential flows.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,
    pub token_ttl: Duration,
    pub refresh_grace: Duration,
    pub bcrypt_cost: u32,
    pub store_timeout: std::time::Duration,
}

impl AuthConfig {
    /// Configuration with default TTLs and cost around the given secret.
    pub fn new(jwt_secret: JwtSecret) -> Self {
        Self {
            jwt_secret,
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            refresh_grace: Duration::seconds(DEFAULT_REFRESH_GRACE_SECS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable             | Default        |
    /// |----------------------|----------------|
    /// | `JWT_SECRET` / `AUTH_SECRET` | required |
    /// | `JWT_EXPIRY`         | `7d`           |
    /// | `JWT_REFRESH_GRACE`  | `1h`           |
    /// | `BCRYPT_COST`        | `10`           |
    /// | `STORE_TIMEOUT_SECS` | `5`            |
    pub fn from_env() -> Result<Self, AuthError> {
        let mut config = Self::new(JwtSecret::from_env()?);

        if let Some(v) = env_var("JWT_EXPIRY") {
            config.token_ttl = parse_duration(&v)?;
        }
        if let Some(v) = env_var("JWT_REFRESH_GRACE") {
            config.refresh_grace = parse_duration(&v)?;
        }
        if let Some(v) = env_var("BCRYPT_COST") {
            config.bcrypt_cost = parse_bcrypt_cost(&v)?;
        }
        if let Some(v) = env_var("STORE_TIMEOUT_SECS") {
            let secs = v.parse::<u64>().map_err(|_| {
                AuthError::ConfigurationError(format!("STORE_TIMEOUT_SECS: invalid value '{v}'"))
            })?;
            config.store_timeout = std::time::Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(self.jwt_secret.clone(), self.token_ttl)
    }

    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.jwt_secret.clone(), self.refresh_grace)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an expiry string such as `7d`, `12h`, `30m`, `45s`, or bare seconds.
pub fn parse_duration(s: &str) -> Result<Duration, AuthError> {
    let invalid = || AuthError::ConfigurationError(format!("invalid duration '{s}'"));
    let s = s.trim();

    let (digits, unit_secs) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 60 * 60),
        Some((i, 'd')) => (&s[..i], 24 * 60 * 60),
        Some(_) => (s, 1),
        None => return Err(invalid()),
    };

    let n = digits.trim().parse::<i64>().map_err(|_| invalid())?;
    if n <= 0 {
        return Err(invalid());
    }
    n.checked_mul(unit_secs)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}

pub fn parse_bcrypt_cost(s: &str) -> Result<u32, AuthError> {
    match s.parse::<u32>() {
        Ok(cost) if (4..=31).contains(&cost) => Ok(cost),
        _ => Err(AuthError::ConfigurationError(format!(
            "bcrypt cost must be between 4 and 31, got '{s}'"
        ))),
    }
}
