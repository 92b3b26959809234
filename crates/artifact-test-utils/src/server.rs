//! [`StubServer`]: in-process stand-in for the remote endpoints.
//!
//! Serves `GET /latest` and `GET /download` on an ephemeral localhost port,
//! counts hits, and records the `Authorization` headers it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::oneshot;

/// A canned response for one endpoint.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: None,
        }
    }

    /// `{"md5": <md5>, "status": <status>}`
    pub fn fingerprint(md5: &str, status: &str) -> Self {
        Self::ok(format!(r#"{{"md5":"{md5}","status":"{status}"}}"#))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct Endpoint {
    response: Mutex<Option<StubResponse>>,
    /// Number of upcoming requests answered with `failure_status` instead
    failures_remaining: AtomicUsize,
    failure_status: Mutex<u16>,
    hits: AtomicUsize,
}

#[derive(Default)]
struct StubState {
    latest: Endpoint,
    download: Endpoint,
    required_token: Mutex<Option<String>>,
    authorization: Mutex<Vec<String>>,
}

/// In-process HTTP server for the "latest" and "download" endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use artifact_test_utils::{StubResponse, StubServer};
///
/// # async fn demo() {
/// let server = StubServer::start().await;
/// server.set_latest(StubResponse::fingerprint("abc123", "ok"));
/// server.set_download(StubResponse::ok(b"weights".to_vec()));
/// let base = server.base_url();
/// # }
/// ```
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    /// Bind to an ephemeral localhost port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/latest", get(latest))
            .route("/download", get(download))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("StubServer: bind");
        let addr = listener.local_addr().expect("StubServer: local addr");
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown: Some(tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn latest_url(&self) -> String {
        format!("{}/latest", self.base_url())
    }

    pub fn download_url(&self) -> String {
        format!("{}/download", self.base_url())
    }

    pub fn set_latest(&self, response: StubResponse) {
        *self.state.latest.response.lock().unwrap() = Some(response);
    }

    pub fn set_download(&self, response: StubResponse) {
        *self.state.download.response.lock().unwrap() = Some(response);
    }

    /// Answer requests without `Authorization: Bearer <token>` with 401.
    pub fn require_token(&self, token: &str) {
        *self.state.required_token.lock().unwrap() = Some(token.to_string());
    }

    /// Answer the next `count` "latest" requests with `status`.
    pub fn fail_latest(&self, count: usize, status: u16) {
        self.state.latest.fail_next(count, status);
    }

    /// Answer the next `count` "download" requests with `status`.
    pub fn fail_download(&self, count: usize, status: u16) {
        self.state.download.fail_next(count, status);
    }

    pub fn latest_hits(&self) -> usize {
        self.state.latest.hits.load(Ordering::SeqCst)
    }

    pub fn download_hits(&self) -> usize {
        self.state.download.hits.load(Ordering::SeqCst)
    }

    /// Every `Authorization` header received, in arrival order.
    pub fn authorization_headers(&self) -> Vec<String> {
        self.state.authorization.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Endpoint {
    fn fail_next(&self, count: usize, status: u16) {
        *self.failure_status.lock().unwrap() = status;
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Option<u16> {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| *self.failure_status.lock().unwrap())
    }
}

async fn latest(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    respond(&state, &state.latest, &headers).await
}

async fn download(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    respond(&state, &state.download, &headers).await
}

async fn respond(state: &StubState, endpoint: &Endpoint, headers: &HeaderMap) -> Response {
    endpoint.hits.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    if let Some(value) = &authorization {
        state.authorization.lock().unwrap().push(value.clone());
    }

    let required = state.required_token.lock().unwrap().clone();
    if let Some(token) = required {
        if authorization.as_deref() != Some(format!("Bearer {token}").as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    if let Some(status) = endpoint.take_failure() {
        return status_code(status).into_response();
    }

    let response = endpoint.response.lock().unwrap().clone();
    let Some(response) = response else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }
    (status_code(response.status), response.body).into_response()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
