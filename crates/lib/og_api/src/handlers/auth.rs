//! Authentication request handlers.

use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::WithRejection;
use og_core::models::auth::{AuthUser, CreatorProfile};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, bearer_token};
use crate::models::{LoginRequest, LogoutResponse, RegisterRequest, TokenResponse};
use crate::services::auth;

/// `POST /auth/register` — create an account and return its first token.
pub async fn register_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let resp = auth::register(&state.auth, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /auth/login` — authenticate with email (or username) + password.
pub async fn login_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state.auth, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/creator-login` — like login, but only creator accounts pass.
pub async fn creator_login_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::creator_login(&state.auth, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/refresh` — exchange the bearer token for a fresh one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<TokenResponse>> {
    let token = bearer_token(&headers)?
        .ok_or_else(|| AppError::InvalidToken("Missing authorization header".into()))?;
    let resp = auth::refresh(&state.auth, token).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — always succeeds.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<LogoutResponse> {
    let token = bearer_token(&headers).ok().flatten();
    Json(auth::logout(&state.auth, token))
}

/// `GET /auth/me` — the account behind the bearer token.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<AuthUser>> {
    let resp = auth::me(&state.auth, &user.0).await?;
    Ok(Json(resp))
}

/// `POST /auth/become-creator` — promote the caller and reissue its token.
pub async fn become_creator_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::become_creator(&state.auth, &user.0).await?;
    Ok(Json(resp))
}

/// `GET /auth/creator-profile` — the caller's creator profile.
pub async fn creator_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<CreatorProfile>> {
    let resp = auth::creator_profile(&state.auth, &user.0).await?;
    Ok(Json(resp))
}
