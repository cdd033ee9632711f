//! Session lifecycle.
//!
//! A [`Session`] owns the current token and drives it through
//! `Unauthenticated → Authenticating → Authenticated ⇄ Refreshing`. Refresh
//! failure always ends in a local logout. Logout is local first; telling the
//! server is fire-and-forget.
//!
//! Every transition bumps a generation counter. A network call that
//! completes after the generation moved on (for example a refresh that
//! finishes after logout) is discarded instead of reviving the session.
//! A login or refresh whose future is dropped mid-call leaves the state
//! where it was before the call started.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{SessionError, TransportError};
use crate::store::{StoredSession, TokenStore};
use crate::transport::{AuthTransport, DEFAULT_NETWORK_TIMEOUT};
use crate::types::{AuthUser, LoginRequest, RegisterRequest, TokenResponse};

/// Default background refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    token: Option<String>,
    identity: Option<AuthUser>,
    generation: u64,
}

impl Inner {
    /// Drop the token and identity and start a new generation.
    fn purge(&mut self) -> Option<String> {
        self.state = SessionState::Unauthenticated;
        self.identity = None;
        self.generation += 1;
        self.token.take()
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Restores `back_to` if dropped while still armed and the session is still
/// in `during` for the same generation.
struct Rollback<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    during: SessionState,
    back_to: SessionState,
    armed: bool,
}

impl<'a> Rollback<'a> {
    fn new(
        inner: &'a Mutex<Inner>,
        generation: u64,
        during: SessionState,
        back_to: SessionState,
    ) -> Self {
        Self {
            inner,
            generation,
            during,
            back_to,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = lock(self.inner);
        if inner.generation == self.generation && inner.state == self.during {
            inner.state = self.back_to;
            debug!(state = ?self.back_to, "in-flight call cancelled; state restored");
        }
    }
}

/// Client-side session over an [`AuthTransport`] and a [`TokenStore`].
pub struct Session<T, S> {
    transport: Arc<T>,
    store: S,
    inner: Mutex<Inner>,
    /// Serializes store writes against the generation check in `persist`.
    store_lock: Mutex<()>,
    /// Held for the whole of a refresh; `try_lock` failing means one is in
    /// flight.
    refresh_lock: tokio::sync::Mutex<()>,
    network_timeout: Duration,
}

impl<T, S> Session<T, S>
where
    T: AuthTransport + 'static,
    S: TokenStore,
{
    pub fn new(transport: Arc<T>, store: S) -> Self {
        Self {
            transport,
            store,
            inner: Mutex::new(Inner {
                state: SessionState::Unauthenticated,
                token: None,
                identity: None,
                generation: 0,
            }),
            store_lock: Mutex::new(()),
            refresh_lock: tokio::sync::Mutex::new(()),
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    pub fn token(&self) -> Option<String> {
        self.inner().token.clone()
    }

    /// Cached identity snapshot. Not authoritative.
    pub fn identity(&self) -> Option<AuthUser> {
        self.inner().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Authenticated | SessionState::Refreshing
        )
    }

    /// Resume a persisted session. Returns whether one was found.
    ///
    /// The token is not checked here; the next refresh or privileged call
    /// settles whether it is still good.
    pub fn restore(&self) -> Result<bool, SessionError> {
        let Some(saved) = self.store.load()? else {
            return Ok(false);
        };
        let mut inner = self.inner();
        inner.generation += 1;
        inner.state = SessionState::Authenticated;
        inner.token = Some(saved.token);
        inner.identity = saved.identity;
        info!("session restored");
        Ok(true)
    }

    pub async fn login(&self, key: &str, password: &str) -> Result<AuthUser, SessionError> {
        let request = LoginRequest {
            email: key.to_string(),
            password: password.to_string(),
        };
        let transport = Arc::clone(&self.transport);
        self.authenticate(async move { transport.login(&request).await })
            .await
    }

    pub async fn creator_login(&self, key: &str, password: &str) -> Result<AuthUser, SessionError> {
        let request = LoginRequest {
            email: key.to_string(),
            password: password.to_string(),
        };
        let transport = Arc::clone(&self.transport);
        self.authenticate(async move { transport.creator_login(&request).await })
            .await
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthUser, SessionError> {
        let transport = Arc::clone(&self.transport);
        self.authenticate(async move { transport.register(&request).await })
            .await
    }

    /// Run a credential call. Any previous session is discarded first.
    async fn authenticate(
        &self,
        call: impl Future<Output = Result<TokenResponse, TransportError>>,
    ) -> Result<AuthUser, SessionError> {
        let generation = {
            let mut inner = self.inner();
            if inner.state == SessionState::Authenticating {
                return Err(SessionError::Busy);
            }
            inner.purge();
            inner.state = SessionState::Authenticating;
            inner.generation
        };
        let mut rollback = Rollback::new(
            &self.inner,
            generation,
            SessionState::Authenticating,
            SessionState::Unauthenticated,
        );
        self.forget_persisted();

        let result = self.bounded(call).await;
        rollback.disarm();

        let mut inner = self.inner();
        if inner.generation != generation {
            debug!("credential call outlived its session; discarding result");
            return Err(SessionError::LoggedOut);
        }
        match result {
            Ok(resp) => {
                let user = resp.user.clone();
                let saved = install(&mut inner, resp);
                drop(inner);
                self.persist(&saved, generation);
                info!(user_id = %user.id, "session authenticated");
                Ok(user)
            }
            Err(e) => {
                inner.state = SessionState::Unauthenticated;
                debug!(error = %e, "authentication failed");
                Err(e.into())
            }
        }
    }

    /// Refresh now, waiting for any refresh already in flight.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless one is already in flight. Returns whether this call ran
    /// a refresh.
    pub async fn refresh_if_idle(&self) -> Result<bool, SessionError> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("refresh already in flight; skipping");
            return Ok(false);
        };
        self.refresh_locked().await?;
        Ok(true)
    }

    /// Caller holds `refresh_lock`.
    async fn refresh_locked(&self) -> Result<(), SessionError> {
        let (token, generation) = {
            let mut inner = self.inner();
            let token = match (&inner.state, &inner.token) {
                (SessionState::Authenticated, Some(token)) => token.clone(),
                _ => return Err(SessionError::NotAuthenticated),
            };
            inner.state = SessionState::Refreshing;
            (token, inner.generation)
        };
        let mut rollback = Rollback::new(
            &self.inner,
            generation,
            SessionState::Refreshing,
            SessionState::Authenticated,
        );

        let transport = Arc::clone(&self.transport);
        let result = self
            .bounded(async move { transport.refresh(&token).await })
            .await;
        rollback.disarm();

        let mut inner = self.inner();
        if inner.generation != generation {
            debug!("refresh completed after logout; discarding");
            return Err(SessionError::LoggedOut);
        }
        match result {
            Ok(resp) => {
                let saved = install(&mut inner, resp);
                drop(inner);
                self.persist(&saved, generation);
                debug!("token refreshed");
                Ok(())
            }
            Err(e) => {
                inner.purge();
                drop(inner);
                self.forget_persisted();
                warn!(error = %e, "refresh failed; session logged out");
                Err(e.into())
            }
        }
    }

    /// Log out locally and notify the server in the background.
    ///
    /// Never blocks on the network and never fails; repeated calls are
    /// no-ops.
    pub fn logout(&self) {
        let token = self.inner().purge();
        self.forget_persisted();

        let Some(token) = token else {
            return;
        };
        info!("session logged out");

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime; skipping server logout notification");
            return;
        };
        let transport = Arc::clone(&self.transport);
        let timeout = self.network_timeout;
        handle.spawn(async move {
            match tokio::time::timeout(timeout, transport.logout(&token)).await {
                Ok(Ok(())) => debug!("server notified of logout"),
                Ok(Err(e)) => debug!(error = %e, "logout notification failed"),
                Err(_) => debug!("logout notification timed out"),
            }
        });
    }

    /// Run a privileged call with the current token.
    ///
    /// An expired token triggers one refresh and one retry. A rejected
    /// token logs the session out.
    pub async fn call<F, Fut, R>(&self, op: F) -> Result<R, SessionError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<R, TransportError>>,
    {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        match self.bounded(op(token.clone())).await {
            Err(TransportError::TokenExpired) => {}
            other => return self.settle(other),
        }

        debug!("token expired mid-call; refreshing");
        {
            let _guard = self.refresh_lock.lock().await;
            // Someone else may have refreshed while we waited.
            if self.token().as_deref() == Some(token.as_str()) {
                self.refresh_locked().await?;
            }
        }

        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        let retried = self.bounded(op(token)).await;
        self.settle(retried)
    }

    fn settle<R>(&self, result: Result<R, TransportError>) -> Result<R, SessionError> {
        if matches!(result, Err(TransportError::TokenRejected)) {
            warn!("token rejected by server; logging out");
            self.logout();
        }
        result.map_err(SessionError::from)
    }

    /// Background refresh every `every`, first tick one period from now.
    ///
    /// Ticks missed while a refresh is slow are skipped, and a tick that
    /// lands during a refresh does nothing.
    pub fn spawn_refresh_task(self: &Arc<Self>, every: Duration) -> RefreshTask
    where
        S: 'static,
    {
        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if session.state() != SessionState::Authenticated {
                    continue;
                }
                match session.refresh_if_idle().await {
                    Ok(true) => debug!("scheduled refresh done"),
                    Ok(false) => {}
                    Err(e) => debug!(error = %e, "scheduled refresh failed"),
                }
            }
        });
        RefreshTask(handle)
    }

    /// Save `saved` unless the session has moved past `generation`.
    fn persist(&self, saved: &StoredSession, generation: u64) {
        let _io = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.inner().generation != generation {
            debug!("session changed before it was persisted; skipping save");
            return;
        }
        if let Err(e) = self.store.save(saved) {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn forget_persisted(&self) {
        let _io = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
    }

    async fn bounded<R>(
        &self,
        call: impl Future<Output = Result<R, TransportError>>,
    ) -> Result<R, TransportError> {
        tokio::time::timeout(self.network_timeout, call)
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

fn install(inner: &mut Inner, resp: TokenResponse) -> StoredSession {
    inner.state = SessionState::Authenticated;
    inner.token = Some(resp.token.clone());
    inner.identity = Some(resp.user.clone());
    StoredSession {
        token: resp.token,
        identity: Some(resp.user),
    }
}

/// Handle to the background refresh task. Stops the task when dropped.
#[derive(Debug)]
pub struct RefreshTask(JoinHandle<()>);

impl RefreshTask {
    pub fn abort(&self) {
        self.0.abort();
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
