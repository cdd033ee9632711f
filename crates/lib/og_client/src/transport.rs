//! Auth API transport.
//!
//! [`AuthTransport`] is the seam the session drives; [`HttpTransport`] is the
//! reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::TransportError;
use crate::types::{AuthUser, ErrorBody, LoginRequest, RegisterRequest, TokenResponse};

/// Default bound on a single network call.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Credential and token calls against the auth API.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, TransportError>;
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, TransportError>;
    async fn creator_login(&self, request: &LoginRequest)
    -> Result<TokenResponse, TransportError>;
    async fn refresh(&self, token: &str) -> Result<TokenResponse, TransportError>;
    /// Best-effort server notification.
    async fn logout(&self, token: &str) -> Result<(), TransportError>;
}

/// HTTP transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Transport for the API rooted at `base_url` (e.g. `http://127.0.0.1:5000`
    /// or `https://example.com/api`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_NETWORK_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("client setup: {e}")))?;
        let mut base_url = Url::parse(base_url)?;
        // `join` replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `GET` a privileged JSON resource with the given token.
    pub async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<R, TransportError> {
        let request = self.client.get(self.endpoint(path)?).bearer_auth(token);
        decode(send(request).await?).await
    }

    /// `GET /auth/me`.
    pub async fn me(&self, token: &str) -> Result<AuthUser, TransportError> {
        self.get_json("/auth/me", token).await
    }

    async fn post_token<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TokenResponse, TransportError> {
        let request = self.client.post(self.endpoint(path)?).json(body);
        decode(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, TransportError> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    })
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, TransportError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| TransportError::Network(format!("response parse error: {e}")));
    }

    let body = response.json::<ErrorBody>().await.ok();
    Err(classify(status, body))
}

/// Map a failed response onto the error the session reacts to.
fn classify(status: StatusCode, body: Option<ErrorBody>) -> TransportError {
    let (code, message) = body
        .map(|b| (b.error, b.message))
        .unwrap_or_else(|| (String::new(), status.to_string()));

    if status == StatusCode::UNAUTHORIZED {
        match code.as_str() {
            "token_expired" => return TransportError::TokenExpired,
            "invalid_token" => return TransportError::TokenRejected,
            _ => {}
        }
    }
    TransportError::Rejected {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, TransportError> {
        self.post_token("/auth/register", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, TransportError> {
        self.post_token("/auth/login", request).await
    }

    async fn creator_login(
        &self,
        request: &LoginRequest,
    ) -> Result<TokenResponse, TransportError> {
        self.post_token("/auth/creator-login", request).await
    }

    async fn refresh(&self, token: &str) -> Result<TokenResponse, TransportError> {
        let request = self
            .client
            .post(self.endpoint("/auth/refresh")?)
            .bearer_auth(token);
        decode(send(request).await?).await
    }

    async fn logout(&self, token: &str) -> Result<(), TransportError> {
        let request = self
            .client
            .post(self.endpoint("/auth/logout")?)
            .bearer_auth(token);
        let response = send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(classify(status, response.json::<ErrorBody>().await.ok()))
        }
    }
}
