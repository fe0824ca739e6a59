#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use odp_session_core::{SessionObserver, TokenStore, Transport};
use odp_session_domain::{
    Endpoints, HttpMethod, Result, SchedulerKind, SessionData, SessionError, TransportRequest,
    TransportResponse,
};
use odp_session_infra::Authenticator;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};

pub const HOST: &str = "https://odp.test";
pub const LOGIN: &str = "/api/a/rbac/login";
pub const REFRESH: &str = "/api/a/rbac/refresh";
pub const HEARTBEAT: &str = "/api/a/rbac/usr/hb";
pub const CHECK: &str = "/api/a/rbac/check";

/// Scripted answer for one request
#[derive(Clone)]
pub enum Step {
    Respond(u16, Value),
    /// No response obtained
    Fail(String),
    /// Wait for the gate before answering
    Gated(Arc<Notify>, u16, Value),
}

impl Step {
    pub fn ok(body: Value) -> Self {
        Self::Respond(200, body)
    }

    pub fn status(status: u16) -> Self {
        Self::Respond(status, Value::Null)
    }
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub request: TransportRequest,
    pub at: Instant,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header_value(name)
    }
}

#[derive(Default)]
struct Script {
    queues: HashMap<String, VecDeque<Step>>,
    defaults: HashMap<String, Step>,
    calls: Vec<Call>,
}

/// Transport double answering from per-path queues
///
/// A path whose queue is empty falls back to its default step, and to a
/// 404 when it has none.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &str, step: Step) -> &Self {
        self.script.lock().queues.entry(path.to_string()).or_default().push_back(step);
        self
    }

    pub fn fallback(&self, path: &str, step: Step) -> &Self {
        self.script.lock().defaults.insert(path.to_string(), step);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.script.lock().calls.iter().filter(|c| c.path == path).cloned().collect()
    }

    /// Offsets of the calls to `path` relative to `start`, in millis
    pub fn offsets(&self, path: &str, start: Instant) -> Vec<u128> {
        self.calls_to(path).iter().map(|c| (c.at - start).as_millis()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let path = request.url.strip_prefix(HOST).unwrap_or(&request.url).to_string();
        let step = {
            let mut script = self.script.lock();
            script.calls.push(Call {
                method: request.method,
                path: path.clone(),
                request: request.clone(),
                at: Instant::now(),
            });
            let queued = script.queues.get_mut(&path).and_then(VecDeque::pop_front);
            queued
                .or_else(|| script.defaults.get(&path).cloned())
                .unwrap_or_else(|| Step::status(404))
        };

        match step {
            Step::Respond(status, body) => Ok(TransportResponse::new(status, body)),
            Step::Fail(reason) => Err(SessionError::Transport(reason)),
            Step::Gated(gate, status, body) => {
                gate.notified().await;
                Ok(TransportResponse::new(status, body))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Established(Option<String>),
    Lost(String),
    MaintenanceFailure(SchedulerKind),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn lost_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Lost(_))).count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_session_established(&self, session: &SessionData) {
        self.events.lock().push(Event::Established(session.token().map(str::to_string)));
    }

    fn on_session_lost(&self, error: &SessionError) {
        self.events.lock().push(Event::Lost(error.to_string()));
    }

    fn on_maintenance_failure(&self, kind: SchedulerKind, _error: &SessionError) {
        self.events.lock().push(Event::MaintenanceFailure(kind));
    }
}

/// In-memory token store recording every save
#[derive(Default)]
pub struct MemoryTokenStore {
    current: Mutex<Option<String>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self { current: Mutex::new(Some(token.to_string())), saves: Mutex::default() }
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().clone()
    }

    pub fn saves(&self) -> Vec<String> {
        self.saves.lock().clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.current())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.current.lock() = Some(token.to_string());
        self.saves.lock().push(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.current.lock() = None;
        Ok(())
    }
}

pub struct Harness {
    pub transport: ScriptedTransport,
    pub observer: Arc<RecordingObserver>,
    pub store: Arc<MemoryTokenStore>,
    pub auth: Authenticator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryTokenStore::default())
    }

    pub fn with_store(store: MemoryTokenStore) -> Self {
        init_tracing();
        let transport = ScriptedTransport::new();
        let observer = Arc::new(RecordingObserver::default());
        let store = Arc::new(store);
        let auth = Authenticator::builder(Arc::new(transport.clone()), Endpoints::from_host(HOST))
            .observer(observer.clone())
            .token_store(store.clone())
            .build();
        Self { transport, observer, store, auth }
    }
}

/// Login body for a user whose token expires in one hour and who must
/// heartbeat every 30 s.
pub fn session_body(token: &str) -> Value {
    json!({
        "token": token,
        "rToken": format!("r-{token}"),
        "uuid": "s1",
        "serverTime": 1_000_000,
        "expiresIn": 4_600_000,
        "rbacUserTokenDuration": 3600,
        "rbacBotTokenDuration": 600,
        "rbacHbInterval": 30,
        "rbacUserToSingleSession": false,
        "rbacUserCloseWindowToLogout": false,
        "rbacUserTokenRefresh": false,
        "bot": false,
        "username": "order-bot"
    })
}

/// `session_body` with the given policy flags switched on.
pub fn with_policy(mut body: Value, refresh: bool, heartbeat: bool) -> Value {
    body["rbacUserTokenRefresh"] = json!(refresh);
    body["rbacUserToSingleSession"] = json!(heartbeat);
    body
}

/// Let spawned tasks run without moving the paused clock past `ms`.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Route session logs to the test writer; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
