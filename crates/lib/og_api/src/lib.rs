//! # og_api
//!
//! HTTP API library for OnlyGames authentication.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use og_core::auth::AuthError;
use og_core::auth::credentials::CredentialService;
use og_core::config::AuthConfig;
use og_core::store::CredentialStore;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::auth;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential flows, token issuer and verifier.
    pub auth: Arc<CredentialService>,
}

impl AppState {
    /// Build state over a credential store.
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            auth: Arc::new(CredentialService::new(store, config)?),
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required). Refresh and logout read the bearer
    // token themselves: refresh accepts recently expired tokens, logout
    // accepts anything.
    let public = Router::new()
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_CREATOR_LOGIN, post(auth::creator_login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Creator-only routes; the gate runs after `require_auth` below.
    let creator = Router::new()
        .route(
            routes::GET_AUTH_CREATOR_PROFILE,
            get(auth::creator_profile_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth::require_creator));

    // Protected routes (require a verified token)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(
            routes::POST_AUTH_BECOME_CREATOR,
            post(auth::become_creator_handler),
        )
        .merge(creator)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
