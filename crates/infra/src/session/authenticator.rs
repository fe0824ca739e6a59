//! Authenticator
//!
//! Caller-facing entry point of the session keeper. Performs the login
//! exchange, installs the session record, and owns the refresh and heartbeat
//! schedulers of the current generation.
//!
//! # Generations
//!
//! Every successful login starts a new scheduler generation identified by an
//! epoch. Tearing a generation down (re-login, escalation, shutdown) bumps
//! the epoch, so a 401 reported by an older generation is recognised as
//! stale and ignored.

use std::sync::Arc;

use odp_session_core::{
    classify_login, HeartbeatPlan, NoopObserver, RefreshPlan, SessionObserver, TokenStore,
    TokenSupplier, Transport,
};
use odp_session_domain::{
    Credentials, Endpoints, Result, SchedulerKind, SchedulerPhase, SessionConfig, SessionData,
    SessionError, TransportRequest,
};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::escalation::EscalationController;
use super::handle::SchedulerSlot;
use super::maintenance::{persist_token, MaintenanceContext};
use super::state::SessionState;
use super::{heartbeat, refresh};
use crate::http::HttpTransport;
use crate::token_store::FileTokenStore;

/// Scheduler slots of the current generation
#[derive(Default)]
struct Maintenance {
    refresh: SchedulerSlot,
    heartbeat: SchedulerSlot,
    epoch: u64,
}

impl Maintenance {
    /// Cancel both schedulers and retire the current generation.
    fn teardown(&mut self, state: &SessionState) {
        self.epoch += 1;
        let refresh = self.refresh.cancel(state);
        let heartbeat = self.heartbeat.cancel(state);
        if refresh || heartbeat {
            debug!(refresh, heartbeat, epoch = self.epoch, "maintenance torn down");
        }
    }

    fn status(&self) -> MaintenanceStatus {
        MaintenanceStatus {
            epoch: self.epoch,
            refresh: self.refresh.phase(),
            heartbeat: self.heartbeat.phase(),
        }
    }
}

/// Point-in-time view of background maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceStatus {
    /// Current scheduler generation
    pub epoch: u64,
    /// Phase of the refresh scheduler, if one is installed
    pub refresh: Option<SchedulerPhase>,
    /// Phase of the heartbeat scheduler, if one is installed
    pub heartbeat: Option<SchedulerPhase>,
}

impl MaintenanceStatus {
    pub fn is_live(&self, kind: SchedulerKind) -> bool {
        let phase = match kind {
            SchedulerKind::Refresh => self.refresh,
            SchedulerKind::Heartbeat => self.heartbeat,
        };
        phase.is_some_and(SchedulerPhase::is_live)
    }

    pub fn is_idle(&self) -> bool {
        !self.is_live(SchedulerKind::Refresh) && !self.is_live(SchedulerKind::Heartbeat)
    }
}

pub(crate) struct SessionInner {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    state: Arc<SessionState>,
    observer: Arc<dyn SessionObserver>,
    token_store: Option<Arc<dyn TokenStore>>,
    credentials: Mutex<Option<Credentials>>,
    maintenance: Mutex<Maintenance>,
    login_lock: tokio::sync::Mutex<()>,
}

/// Owns one authenticated session and keeps it alive.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<SessionInner>,
}

/// Builder for [`Authenticator`].
pub struct AuthenticatorBuilder {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    observer: Arc<dyn SessionObserver>,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl AuthenticatorBuilder {
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn build(self) -> Authenticator {
        Authenticator {
            inner: Arc::new(SessionInner {
                transport: self.transport,
                endpoints: self.endpoints,
                state: Arc::new(SessionState::new()),
                observer: self.observer,
                token_store: self.token_store,
                credentials: Mutex::new(None),
                maintenance: Mutex::new(Maintenance::default()),
                login_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

impl Authenticator {
    pub fn builder(transport: Arc<dyn Transport>, endpoints: Endpoints) -> AuthenticatorBuilder {
        AuthenticatorBuilder {
            transport,
            endpoints,
            observer: Arc::new(NoopObserver),
            token_store: None,
        }
    }

    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self::builder(transport, endpoints).build()
    }

    /// Reqwest transport and file token store wired from configuration.
    ///
    /// # Errors
    /// Returns [`SessionError::Config`] for invalid configuration, or the
    /// transport construction error.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config.http)?;
        Ok(Self::builder(Arc::new(transport), config.endpoints())
            .token_store(Arc::new(FileTokenStore::new(&config.token_store_path)))
            .build())
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    /// Log in and start maintenance as the server policy requires.
    ///
    /// Any schedulers of a previous login are cancelled before the new ones
    /// start. Logins are serialized, including re-logins triggered by a 401.
    ///
    /// # Errors
    /// - [`SessionError::Auth`] when the server answers anything but 200
    /// - [`SessionError::Transport`] when the call could not complete
    /// - [`SessionError::InvalidResponse`] when a 200 carries no token
    ///
    /// On error the session record and running schedulers are left as they
    /// were.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData> {
        let _guard = self.inner.login_lock.lock().await;
        self.login_locked(credentials).await
    }

    /// Reuse a stored token if the server still accepts it, else log in.
    ///
    /// A stored token the server rejects is removed from the store.
    ///
    /// # Errors
    /// Same as [`Authenticator::login`] when the fallback login fails.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn resume_or_login(&self, credentials: Credentials) -> Result<SessionData> {
        let _guard = self.inner.login_lock.lock().await;

        if let Some(token) = self.stored_token().await {
            match self.check_locked(&token).await {
                Ok(session) => {
                    *self.inner.credentials.lock() = Some(credentials);
                    info!("resumed session from stored token");
                    return Ok(session);
                }
                Err(err) => {
                    info!(error = %err, "stored token not accepted; logging in");
                    if matches!(err, SessionError::Auth { .. }) {
                        self.discard_stored_token().await;
                    }
                }
            }
        }

        self.login_locked(credentials).await
    }

    /// Current bearer token, never blocking on maintenance.
    pub fn get_token(&self) -> Option<String> {
        self.inner.state.token()
    }

    /// Shared read-only token access for request collaborators.
    pub fn token_supplier(&self) -> Arc<dyn TokenSupplier> {
        self.inner.state.clone()
    }

    /// Snapshot of the session record.
    pub fn session(&self) -> SessionData {
        self.inner.state.snapshot()
    }

    /// `false` before the first login and after a failed re-login.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.is_authenticated()
    }

    pub fn maintenance_status(&self) -> MaintenanceStatus {
        self.inner.maintenance.lock().status()
    }

    /// Stop all background maintenance.
    ///
    /// Waits for an in-flight login or escalation to finish first. The
    /// session record stays readable.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let _guard = self.inner.login_lock.lock().await;
        self.inner.maintenance.lock().teardown(&self.inner.state);
        info!("session maintenance stopped");
    }

    /// Re-login after a 401 reported by generation `epoch`.
    pub(crate) async fn escalate(&self, origin: SchedulerKind, epoch: u64) {
        let _guard = self.inner.login_lock.lock().await;
        {
            let mut maintenance = self.inner.maintenance.lock();
            if maintenance.epoch != epoch {
                debug!(%origin, epoch, current = maintenance.epoch, "escalation superseded");
                return;
            }
            maintenance.teardown(&self.inner.state);
        }

        warn!(%origin, "session rejected; re-authenticating");
        let credentials = self.inner.credentials.lock().clone();
        let result = match credentials {
            Some(credentials) => self.login_locked(credentials).await,
            None => Err(SessionError::NotAuthenticated),
        };

        match result {
            Ok(_) => info!(%origin, "session re-established"),
            Err(err) => {
                error!(%origin, error = %err, "re-authentication failed; session lost");
                self.inner.state.set_authenticated(false);
                self.inner.observer.on_session_lost(&err);
            }
        }
    }

    async fn login_locked(&self, credentials: Credentials) -> Result<SessionData> {
        let request = TransportRequest::post(self.inner.endpoints.login())
            .json(json!({ "username": credentials.username, "password": credentials.password }));

        let session = classify_login(self.inner.transport.send(request).await)
            .inspect_err(|err| warn!(error = %err, "login failed"))?;

        *self.inner.credentials.lock() = Some(credentials);
        Ok(self.establish(session).await)
    }

    async fn check_locked(&self, token: &str) -> Result<SessionData> {
        let request = TransportRequest::get(self.inner.endpoints.check()).jwt(token);
        let response = self.inner.transport.send(request).await?;
        if !response.is_ok() {
            return Err(SessionError::Auth { status: response.status, body: response.body });
        }

        let mut patch = SessionData::from_response_body(&response.body)?;
        if !patch.has_token() {
            patch.token = Some(token.to_string());
        }
        Ok(self.establish(patch).await)
    }

    async fn stored_token(&self) -> Option<String> {
        let store = self.inner.token_store.as_ref()?;
        match store.load().await {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored token");
                None
            }
        }
    }

    async fn discard_stored_token(&self) {
        let Some(store) = self.inner.token_store.as_ref() else {
            return;
        };
        if let Err(err) = store.clear().await {
            warn!(error = %err, "failed to discard rejected stored token");
        }
    }

    /// Install `patch` as the new session and start a fresh generation.
    async fn establish(&self, patch: SessionData) -> SessionData {
        let state = &self.inner.state;
        let (merged, status) = {
            let mut maintenance = self.inner.maintenance.lock();
            maintenance.teardown(state);
            let merged = state.install(patch);
            self.start_maintenance(&mut maintenance, &merged);
            (merged, maintenance.status())
        };

        info!(
            epoch = status.epoch,
            refresh = status.refresh.is_some(),
            heartbeat = status.heartbeat.is_some(),
            "session established"
        );

        if let Some(token) = merged.token() {
            persist_token(self.inner.token_store.as_ref(), token).await;
        }
        self.inner.observer.on_session_established(&merged);
        merged
    }

    fn start_maintenance(&self, maintenance: &mut Maintenance, session: &SessionData) {
        let ctx = MaintenanceContext {
            transport: Arc::clone(&self.inner.transport),
            endpoints: self.inner.endpoints.clone(),
            state: Arc::clone(&self.inner.state),
            observer: Arc::clone(&self.inner.observer),
            token_store: self.inner.token_store.clone(),
            escalation: EscalationController::new(Arc::downgrade(&self.inner), maintenance.epoch),
        };
        let state = &self.inner.state;

        if session.wants_heartbeat() {
            match HeartbeatPlan::from_session(session) {
                Ok(plan) => {
                    let ctx = ctx.clone();
                    maintenance.heartbeat.install(state, move || heartbeat::start(ctx, plan));
                }
                Err(err) => warn!(error = %err, "heartbeat required but cannot be scheduled"),
            }
        } else {
            debug!("heartbeat not required by policy");
        }

        if session.wants_refresh() {
            match RefreshPlan::from_session(session) {
                Ok(plan) => maintenance.refresh.install(state, move || refresh::start(ctx, plan)),
                Err(err) => warn!(error = %err, "token refresh required but cannot be scheduled"),
            }
        } else {
            debug!("token refresh not required by policy");
        }
    }
}

impl TokenSupplier for Authenticator {
    fn current_token(&self) -> Option<String> {
        self.get_token()
    }
}
