//! In-process device stand-in for tests.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header::REFERER, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

use pifire_common::{API_CONTROL, API_CURRENT, API_HOPPER, API_SETTINGS, HISTORY_REFRESH};

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub referer: String,
    pub body: Value,
}

#[derive(Debug)]
struct StubState {
    current_status: StatusCode,
    current_delay: Duration,
    current: Value,
    hopper_status: StatusCode,
    hopper: Value,
    history: Value,
    post_status: HashMap<String, StatusCode>,
    received: Vec<ReceivedRequest>,
}

#[derive(Debug, Clone)]
pub struct DeviceStub {
    inner: Arc<Mutex<StubState>>,
}

impl Default for DeviceStub {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubState {
                current_status: StatusCode::OK,
                current_delay: Duration::ZERO,
                current: json!({}),
                hopper_status: StatusCode::OK,
                hopper: json!({}),
                history: json!({}),
                post_status: HashMap::new(),
                received: Vec::new(),
            })),
        }
    }
}

impl DeviceStub {
    pub async fn set_current(&self, payload: Value) {
        self.inner.lock().await.current = payload;
    }

    pub async fn set_current_status(&self, status: StatusCode) {
        self.inner.lock().await.current_status = status;
    }

    /// Holds every `/api/current` reply back by `delay`.
    pub async fn set_current_delay(&self, delay: Duration) {
        self.inner.lock().await.current_delay = delay;
    }

    pub async fn set_hopper(&self, payload: Value) {
        self.inner.lock().await.hopper = payload;
    }

    pub async fn set_hopper_status(&self, status: StatusCode) {
        self.inner.lock().await.hopper_status = status;
    }

    pub async fn set_history(&self, payload: Value) {
        self.inner.lock().await.history = payload;
    }

    pub async fn set_post_status(&self, path: &str, status: StatusCode) {
        self.inner
            .lock()
            .await
            .post_status
            .insert(path.to_string(), status);
    }

    pub async fn received(&self) -> Vec<ReceivedRequest> {
        self.inner.lock().await.received.clone()
    }

    /// Serves the stub on an ephemeral port and returns its base url.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route(API_CURRENT, get(handle_current))
            .route(API_HOPPER, get(handle_hopper))
            .route(API_CONTROL, post(handle_post))
            .route(API_SETTINGS, post(handle_post))
            .route(HISTORY_REFRESH, post(handle_post))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }
}

/// Base url of a port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn handle_current(State(stub): State<DeviceStub>) -> impl IntoResponse {
    let delay = stub.inner.lock().await.current_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let state = stub.inner.lock().await;
    (state.current_status, Json(state.current.clone()))
}

async fn handle_hopper(State(stub): State<DeviceStub>) -> impl IntoResponse {
    let state = stub.inner.lock().await;
    (state.hopper_status, Json(state.hopper.clone()))
}

async fn handle_post(
    State(stub): State<DeviceStub>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut state = stub.inner.lock().await;
    let path = uri.path().to_string();
    let referer = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    state.received.push(ReceivedRequest {
        path: path.clone(),
        referer,
        body,
    });

    let status = state
        .post_status
        .get(&path)
        .copied()
        .unwrap_or(StatusCode::OK);
    let reply = if path == HISTORY_REFRESH {
        state.history.clone()
    } else {
        json!({"result": "OK"})
    };
    (status, Json(reply))
}
