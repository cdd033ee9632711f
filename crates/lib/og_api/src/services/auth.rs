//! Authentication service — wire-level flows delegating to `og_core::auth`.

use og_core::auth::credentials::{CredentialService, IssuedToken, NewAccount};
use og_core::auth::jwt::VerifiedClaims;
use og_core::models::auth::{AuthUser, CreatorProfile};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{LogoutResponse, RegisterRequest, TokenResponse};

/// Token type reported alongside every issued token.
pub const TOKEN_TYPE: &str = "Bearer";

fn token_response(auth: &CredentialService, issued: IssuedToken) -> TokenResponse {
    TokenResponse {
        token: issued.token,
        token_type: TOKEN_TYPE.into(),
        expires_in: auth.issuer().ttl().num_seconds(),
        user: issued.user,
    }
}

pub async fn register(auth: &CredentialService, body: RegisterRequest) -> AppResult<TokenResponse> {
    let issued = auth
        .register(NewAccount {
            username: body.username,
            email: body.email,
            password: body.password,
            is_creator: body.is_creator,
        })
        .await?;
    Ok(token_response(auth, issued))
}

pub async fn login(auth: &CredentialService, key: &str, password: &str) -> AppResult<TokenResponse> {
    let issued = auth.login(key, password).await?;
    Ok(token_response(auth, issued))
}

pub async fn creator_login(
    auth: &CredentialService,
    key: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let issued = auth.creator_login(key, password).await?;
    Ok(token_response(auth, issued))
}

pub async fn refresh(auth: &CredentialService, token: &str) -> AppResult<TokenResponse> {
    let issued = auth.refresh(token).await?;
    Ok(token_response(auth, issued))
}

/// Tokens are stateless; logout only records the event.
pub fn logout(auth: &CredentialService, token: Option<&str>) -> LogoutResponse {
    match token.map(|t| auth.verifier().verify_for_refresh(t)) {
        Some(Ok(claims)) => info!(user_id = claims.user_id(), "logout"),
        Some(Err(_)) => info!("logout with unverifiable token"),
        None => info!("anonymous logout"),
    }
    LogoutResponse { success: true }
}

pub async fn me(auth: &CredentialService, claims: &VerifiedClaims) -> AppResult<AuthUser> {
    Ok(auth.profile(claims).await?)
}

/// Profile of the account behind `claims`. The stored role is checked
/// again, independent of the token's creator claim.
pub async fn creator_profile(
    auth: &CredentialService,
    claims: &VerifiedClaims,
) -> AppResult<CreatorProfile> {
    auth.profile(claims)
        .await?
        .creator_profile
        .ok_or_else(|| AppError::Forbidden("Creator privileges required".into()))
}

pub async fn become_creator(
    auth: &CredentialService,
    claims: &VerifiedClaims,
) -> AppResult<TokenResponse> {
    let issued = auth.promote_to_creator(claims).await?;
    Ok(token_response(auth, issued))
}
