// src/test_utils/mock_graph_server.rs
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as seen by the mock Marketing API.
#[derive(Debug, Clone)]
pub struct RecordedGraphRequest {
    pub path: String,
    pub content_type: String,
    /// Form fields; empty for multipart uploads.
    pub fields: HashMap<String, String>,
}

#[derive(Clone)]
struct MockGraphState {
    requests: Arc<Mutex<Vec<RecordedGraphRequest>>>,
    counter: Arc<Mutex<u32>>,
    failure: Option<(StatusCode, Value)>,
}

impl MockGraphState {
    fn next_id(&self) -> u32 {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        *counter
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, fields: HashMap<String, String>) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.requests.lock().unwrap().push(RecordedGraphRequest {
            path: uri.path().to_string(),
            content_type,
            fields,
        });
    }
}

async fn edge_handler(
    State(state): State<MockGraphState>,
    uri: Uri,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    log::debug!("Mock Graph API received {} {:?}", uri, fields);
    state.record(&uri, &headers, fields);

    if let Some((status, body)) = &state.failure {
        return (*status, Json(body.clone()));
    }

    let edge = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let id = state.next_id();
    (StatusCode::OK, Json(json!({ "id": format!("{}-{}", edge, id) })))
}

async fn image_handler(
    State(state): State<MockGraphState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    log::debug!("Mock Graph API received image upload of {} bytes", body.len());
    state.record(&uri, &headers, HashMap::new());

    if let Some((status, body)) = &state.failure {
        return (*status, Json(body.clone()));
    }

    let id = state.next_id();
    (
        StatusCode::OK,
        Json(json!({
            "images": {
                "ad_image.png": {
                    "hash": format!("hash-{}", id),
                    "url": "https://example.invalid/ad_image.png"
                }
            }
        })),
    )
}

pub struct MockGraphServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedGraphRequest>>>,
}

impl MockGraphServer {
    /// Answers every create call with `<edge>-<n>` ids.
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Answers every call with the given status and Graph error body.
    pub async fn start_failing(status: u16, body: Value) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        Self::start_with(Some((status, body))).await
    }

    async fn start_with(failure: Option<(StatusCode, Value)>) -> Self {
        let state = MockGraphState {
            requests: Arc::new(Mutex::new(Vec::new())),
            counter: Arc::new(Mutex::new(0)),
            failure,
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/{version}/{account}/adimages", post(image_handler))
            .route("/{version}/{account}/{edge}", post(edge_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock Graph API listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock Graph API error: {}", e);
                });
        });

        MockGraphServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recorded_requests(&self) -> Vec<RecordedGraphRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock Graph API shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
}
