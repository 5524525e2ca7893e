//! End-to-end tests for the Talent Ops client.
//!
//! [`MockBackend`] serves the account endpoints and the realtime WebSocket
//! on `127.0.0.1:0`; [`Harness`] wires an [`AppContext`] to it over memory
//! storage with collecting notifier and navigator.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p talent-ops-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use talent_ops_client::notify::{CollectingNavigator, CollectingNotifier};
use talent_ops_client::{
    AppContext, ClientConfig, ClientError, ClientStorage, MemoryStorage, Navigator, Notifier,
    ReconnectConfig,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "token-alice";

/// Envelope message for a rejected login.
pub const LOGIN_REJECTED: &str = "Invalid username or password";

#[derive(Debug, Clone)]
enum Push {
    Text(String),
    Close,
}

struct MockState {
    profile: Mutex<Value>,
    pushes: broadcast::Sender<Push>,
    connections: AtomicUsize,
    handshakes: AtomicUsize,
    refusing: AtomicBool,
    received: Mutex<Vec<String>>,
    ws_tokens: Mutex<Vec<Option<String>>>,
    users_query: Mutex<Option<(u32, u32)>>,
}

/// Backend double bound to a local port. The server stops on drop.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind and start serving.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let (pushes, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            profile: Mutex::new(json!({
                "id": 7,
                "username": USERNAME,
                "email": "alice@example.com",
                "role": "hr",
                "real_name": "Alice Liddell",
                "department": "People",
                "position": "Recruiter",
                "status": "active",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            })),
            pushes,
            connections: AtomicUsize::new(0),
            handshakes: AtomicUsize::new(0),
            refusing: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
            ws_tokens: Mutex::new(Vec::new()),
            users_query: Mutex::new(None),
        });

        let app = Router::new()
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/profile", get(profile).put(update_profile))
            .route("/users", get(users))
            .route("/fail", get(fail))
            .route("/expired", get(expired))
            .route("/forbidden", get(forbidden))
            .route("/broken", get(broken))
            .route("/ws", get(ws))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Send a text frame to every open socket.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.state.pushes.send(Push::Text(text.into()));
    }

    /// Close every open socket from the server side.
    pub fn close_connections(&self) {
        let _ = self.state.pushes.send(Push::Close);
    }

    /// Answer later WebSocket handshakes with 503 instead of upgrading.
    pub fn refuse_websockets(&self) {
        self.state.refusing.store(true, Ordering::SeqCst);
    }

    /// WebSocket handshakes seen so far, refused ones included.
    pub fn handshakes(&self) -> usize {
        self.state.handshakes.load(Ordering::SeqCst)
    }

    /// Sockets accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Text frames the client sent.
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    /// `token` query parameter of each WebSocket handshake.
    pub fn ws_tokens(&self) -> Vec<Option<String>> {
        self.state.ws_tokens.lock().clone()
    }

    /// `(page, page_size)` of the last `GET /users`.
    pub fn last_users_query(&self) -> Option<(u32, u32)> {
        *self.state.users_query.lock()
    }

    /// Poll until `check` holds, for at most five seconds.
    pub async fn wait_until(&self, check: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..100 {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        check(self)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.close_connections();
        self.server.abort();
    }
}

/// An address nothing listens on.
///
/// # Errors
///
/// Returns the I/O error if no ephemeral port can be bound.
pub fn unused_addr() -> std::io::Result<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    listener.local_addr()
}

/// A client context wired to a backend, with its effects captured.
pub struct Harness {
    pub ctx: AppContext,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<CollectingNotifier>,
    pub navigator: Arc<CollectingNavigator>,
}

impl Harness {
    /// Context for `api_url` with fast reconnects.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the URL is invalid or the context cannot be
    /// initialized.
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        Self::with_reconnect(
            api_url,
            ReconnectConfig {
                delay: Duration::from_millis(50),
                max_attempts: 3,
            },
        )
    }

    /// Context for `api_url` with the given reconnect policy.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the URL is invalid or the context cannot be
    /// initialized.
    pub fn with_reconnect(api_url: &str, reconnect: ReconnectConfig) -> Result<Self, ClientError> {
        Self::over(api_url, reconnect, Arc::new(MemoryStorage::new()))
    }

    /// Context over existing storage, as after an application restart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the URL is invalid or the context cannot be
    /// initialized.
    pub fn over(
        api_url: &str,
        reconnect: ReconnectConfig,
        storage: Arc<MemoryStorage>,
    ) -> Result<Self, ClientError> {
        let storage_path = std::env::temp_dir().join("talent-ops-unused.json");
        let mut config = ClientConfig::for_api(api_url, storage_path)?;
        config.reconnect = reconnect;
        config.request_timeout = Duration::from_secs(5);

        let notifier = Arc::new(CollectingNotifier::new());
        let navigator = Arc::new(CollectingNavigator::new());
        let shared_storage: Arc<dyn ClientStorage> = storage.clone();
        let shared_notifier: Arc<dyn Notifier> = notifier.clone();
        let shared_navigator: Arc<dyn Navigator> = navigator.clone();
        let ctx = AppContext::new(config, shared_storage, shared_notifier, shared_navigator)?;
        ctx.init()?;

        Ok(Self {
            ctx,
            storage,
            notifier,
            navigator,
        })
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response()
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"code": 0, "message": "success", "data": data}))
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);

    match (username, password) {
        (Some(USERNAME), Some(PASSWORD)) => {
            let user = state.profile.lock().clone();
            ok(json!({"token": TOKEN, "user": user}))
        }
        // accepted without a payload
        (Some("ghost"), _) => Json(json!({"code": 0, "message": "success"})),
        (Some("blank"), _) => {
            let user = state.profile.lock().clone();
            ok(json!({"token": "", "user": user}))
        }
        _ => Json(json!({"code": 1, "message": LOGIN_REJECTED})),
    }
}

async fn register(Json(body): Json<Value>) -> Json<Value> {
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    if username == USERNAME {
        return Json(json!({"code": 1, "message": "Username already exists"}));
    }
    ok(json!({
        "id": 8,
        "username": username,
        "email": body.get("email").cloned().unwrap_or(Value::Null),
        "role": body.get("role").cloned().unwrap_or_else(|| json!("candidate")),
        "status": "active"
    }))
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let user = state.profile.lock().clone();
    ok(user).into_response()
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let user = {
        let mut profile = state.profile.lock();
        if let (Some(profile), Some(changes)) = (profile.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                profile.insert(key.clone(), value.clone());
            }
        }
        profile.clone()
    };
    ok(user).into_response()
}

#[derive(Debug, Deserialize)]
struct UsersQuery {
    page: u32,
    page_size: u32,
}

async fn users(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<UsersQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    *state.users_query.lock() = Some((query.page, query.page_size));
    let user = state.profile.lock().clone();
    ok(json!({
        "users": [user],
        "total": 1,
        "page": query.page,
        "page_size": query.page_size
    }))
    .into_response()
}

async fn fail() -> Json<Value> {
    Json(json!({"code": 1, "message": "X"}))
}

async fn expired() -> Response {
    unauthorized()
}

async fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"error": "Forbidden"}))).into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

async fn ws(
    State(state): State<Arc<MockState>>,
    Query(query): Query<WsQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    state.handshakes.fetch_add(1, Ordering::SeqCst);
    if state.refusing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    state.ws_tokens.lock().push(query.token);
    upgrade.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: Arc<MockState>) {
    let mut pushes = state.pushes.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => state.received.lock().push(text.as_str().to_owned()),
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            push = pushes.recv() => match push {
                Ok(Push::Text(text)) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close) | Err(broadcast::error::RecvError::Closed) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            },
        }
    }
}
