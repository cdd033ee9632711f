//! End-to-end: a session over `HttpTransport` against the real router.

use std::sync::Arc;

use og_api::AppState;
use og_client::types::{AuthUser, RegisterRequest};
use og_client::{
    FileTokenStore, HttpTransport, Session, SessionError, SessionState, TokenStore,
    TransportError,
};
use og_core::auth::jwt::JwtSecret;
use og_core::config::AuthConfig;
use og_core::store::InMemoryCredentialStore;
use tokio::net::TcpListener;

async fn serve() -> String {
    let mut config = AuthConfig::new(JwtSecret::new("http-session-secret-0123456789abcdef").unwrap());
    config.bcrypt_cost = 4;
    let state = AppState::new(Arc::new(InMemoryCredentialStore::new()), &config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, og_api::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn alice() -> RegisterRequest {
    RegisterRequest {
        username: "alice".into(),
        email: "a@x.com".into(),
        password: "secret1".into(),
        is_creator: false,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn register_refresh_call_logout() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("session.json"));
    let transport = Arc::new(HttpTransport::new(&base).unwrap());
    let session = Session::new(transport.clone(), store.clone());

    let user = session.register(alice()).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(session.state(), SessionState::Authenticated);
    let first = session.token().unwrap();
    assert_eq!(store.load().unwrap().unwrap().token, first);

    session.refresh().await.unwrap();
    let second = session.token().unwrap();
    assert_ne!(first, second);

    let me: AuthUser = session
        .call(|token| {
            let transport = transport.clone();
            async move { transport.me(&token).await }
        })
        .await
        .unwrap();
    assert_eq!(me.id, user.id);

    session.logout();
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert!(store.load().unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn persisted_session_survives_restart() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    {
        let session = Session::new(
            Arc::new(HttpTransport::new(&base).unwrap()),
            FileTokenStore::new(&path),
        );
        session.register(alice()).await.unwrap();
    }

    let session = Session::new(
        Arc::new(HttpTransport::new(&base).unwrap()),
        FileTokenStore::new(&path),
    );
    assert!(session.restore().unwrap());
    assert_eq!(session.identity().unwrap().username, "alice");
    session.refresh().await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_leaves_session_unauthenticated() {
    let base = serve().await;
    let transport = Arc::new(HttpTransport::new(&base).unwrap());
    let session = Session::new(transport, og_client::MemoryTokenStore::new());
    session.register(alice()).await.unwrap();
    session.logout();

    let err = session.login("a@x.com", "not-it").await.unwrap_err();
    match err {
        SessionError::Transport(TransportError::Rejected { status, code, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(code, "invalid_credentials");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Unauthenticated);

    session.login("alice", "secret1").await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test(flavor = "multi_thread")]
async fn forged_token_forces_logout() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("session.json"));
    store
        .save(&og_client::StoredSession {
            token: "forged.token.value".into(),
            identity: None,
        })
        .unwrap();

    let session = Session::new(Arc::new(HttpTransport::new(&base).unwrap()), store);
    assert!(session.restore().unwrap());

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Transport(TransportError::TokenRejected)
    ));
    assert_eq!(session.state(), SessionState::Unauthenticated);
}
