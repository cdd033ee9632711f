//! Authentication middleware — Bearer token extraction, verification and
//! the creator gate.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use og_core::auth::gate::{Capability, authorize};
use og_core::auth::jwt::VerifiedClaims;

use crate::AppState;
use crate::error::AppError;

/// Verified claims stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub VerifiedClaims);

/// Extract the token from `Authorization: Bearer <token>`.
///
/// `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::InvalidToken("Malformed authorization header".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::InvalidToken("Invalid authorization scheme".into()))?
        .trim();
    if token.is_empty() {
        return Err(AppError::InvalidToken("Missing bearer token".into()));
    }
    Ok(Some(token))
}

/// Axum middleware: verifies the bearer token and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?
        .ok_or_else(|| AppError::InvalidToken("Missing authorization header".into()))?;

    let claims = state.auth.verifier().verify(token)?;

    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Axum middleware: admits only creator tokens. Must run inside
/// [`require_auth`].
pub async fn require_creator(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::InvalidToken("Missing authorization header".into()))?;
    authorize(&user.0, Capability::CreatorOnly)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn absent_header_is_none() {
        assert!(bearer_token(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let h = headers("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&h).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(matches!(
            bearer_token(&headers("Basic Zm9vOmJhcg==")),
            Err(AppError::InvalidToken(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer   ")),
            Err(AppError::InvalidToken(_))
        ));
    }
}
