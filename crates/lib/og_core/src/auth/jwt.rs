//! JWT token issuance and verification.
//!
//! Tokens are HS256-signed and self-contained: nothing is stored server-side,
//! so verifying one needs only the shared secret. Verification is two-staged
//! so callers can tell a forged token (`InvalidToken`) from one that is
//! merely old (`ExpiredToken`).

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Access token lifetime: 7 days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// How long after expiry a token may still be exchanged for a new one.
pub const DEFAULT_REFRESH_GRACE_SECS: i64 = 60 * 60;

/// Secrets shorter than this are accepted, but logged.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// HS256 signing secret.
#[derive(Clone)]
pub struct JwtSecret(Vec<u8>);

impl JwtSecret {
    /// Wrap a secret. An empty secret is a configuration error.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(AuthError::ConfigurationError(
                "JWT signing secret is empty".into(),
            ));
        }
        if secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                len = secret.len(),
                recommended = RECOMMENDED_SECRET_LEN,
                "JWT signing secret is shorter than recommended"
            );
        }
        Ok(Self(secret))
    }

    /// Resolve the secret from `JWT_SECRET`, then `AUTH_SECRET`.
    ///
    /// There is no generated or built-in fallback: a missing secret is fatal.
    pub fn from_env() -> Result<Self, AuthError> {
        for var in ["JWT_SECRET", "AUTH_SECRET"] {
            if let Ok(secret) = std::env::var(var)
                && !secret.trim().is_empty()
            {
                return Self::new(secret);
            }
        }
        Err(AuthError::ConfigurationError(
            "JWT_SECRET is not set".into(),
        ))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}

/// Identity and role to embed in a new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueClaims {
    pub user_id: String,
    pub is_creator: Option<bool>,
}

impl IssueClaims {
    /// Claims for an account, omitting the creator flag for members.
    pub fn for_account(user_id: impl Into<String>, is_creator: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_creator: is_creator.then_some(true),
        }
    }
}

/// Claims that passed signature and expiry checks.
///
/// Only [`TokenVerifier`] can construct this, so anything holding one has
/// been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims(TokenClaims);

impl VerifiedClaims {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }

    /// `true` only when the token explicitly carries `isCreator: true`.
    pub fn is_creator(&self) -> bool {
        self.0.is_creator == Some(true)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        timestamp(self.0.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.0.exp)
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.0
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// Signs new access tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: JwtSecret,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: JwtSecret, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid for the configured TTL from now.
    pub fn issue(&self, claims: IssueClaims) -> Result<String, AuthError> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, claims: IssueClaims, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            user_id: claims.user_id,
            is_creator: claims.is_creator,
            iat,
            exp: iat + self.ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }
}

/// Checks signatures and expiry of inbound tokens.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    secret: JwtSecret,
    refresh_grace: Duration,
}

impl TokenVerifier {
    pub fn new(secret: JwtSecret, refresh_grace: Duration) -> Self {
        Self {
            secret,
            refresh_grace,
        }
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// The signature is checked first; a forged token is `InvalidToken` even
    /// when it also claims to be expired.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedClaims, AuthError> {
        let claims = self.decode_signed(token)?;
        if now.timestamp() > claims.exp {
            return Err(AuthError::ExpiredToken);
        }
        Ok(VerifiedClaims(claims))
    }

    /// Verify a token presented for refresh.
    ///
    /// Same as [`verify`](Self::verify), but a correctly signed token stays
    /// acceptable for the refresh grace period after it expires.
    pub fn verify_for_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.verify_for_refresh_at(token, Utc::now())
    }

    pub fn verify_for_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaims, AuthError> {
        let claims = self.decode_signed(token)?;
        if now.timestamp() > claims.exp + self.refresh_grace.num_seconds() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(VerifiedClaims(claims))
    }

    /// Structural parse and signature check only. Expiry is left to callers.
    fn decode_signed(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("rejected token: {e}");
            AuthError::InvalidToken(e.to_string())
        })
    }
}
