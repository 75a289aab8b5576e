// src/test_utils/mock_search_server.rs
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as seen by the mock search providers.
#[derive(Debug, Clone)]
pub struct RecordedSearchRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    /// JSON body; `Null` for GET requests.
    pub body: Value,
}

#[derive(Clone)]
struct MockSearchState {
    requests: Arc<Mutex<Vec<RecordedSearchRequest>>>,
    failure: Option<(StatusCode, Value)>,
}

impl MockSearchState {
    fn record(&self, uri: &Uri, headers: &HeaderMap, query: HashMap<String, String>, body: Value) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(RecordedSearchRequest {
            path: uri.path().to_string(),
            query,
            authorization,
            body,
        });
    }
}

fn tavily_response() -> Value {
    json!({
        "query": "Stride trail runner",
        "answer": "Stride makes lightweight trail shoes.",
        "results": [
            {
                "title": "Stride Trail Runner",
                "url": "https://stride.example/trail",
                "content": "The Trail Runner weighs 220 g and grips wet rock.",
                "score": 0.91
            },
            {
                "title": "Best trail shoes of the year",
                "url": "https://reviews.example/trail-shoes",
                "content": "Our testers ranked the Trail Runner first for comfort.",
                "score": 0.84
            }
        ],
        "response_time": 0.42
    })
}

fn duckduckgo_response() -> Value {
    json!({
        "Heading": "",
        "AbstractText": "",
        "RelatedTopics": [
            {"Text": "Trail running - running over hiking trails", "FirstURL": "https://duckduckgo.com/Trail_running"},
            {"Name": "Gear", "Topics": [
                {"Text": "Trail shoe - footwear for rough terrain", "FirstURL": "https://duckduckgo.com/Trail_shoe"}
            ]}
        ]
    })
}

async fn tavily_handler(
    State(state): State<MockSearchState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    log::debug!("Mock Tavily received {}", body);
    state.record(&uri, &headers, HashMap::new(), body);

    match &state.failure {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (StatusCode::OK, Json(tavily_response())),
    }
}

async fn duckduckgo_handler(
    State(state): State<MockSearchState>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    log::debug!("Mock DuckDuckGo received {:?}", query);
    state.record(&uri, &headers, query, Value::Null);

    match &state.failure {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (StatusCode::OK, Json(duckduckgo_response())),
    }
}

/// Serves Tavily's `POST /search` and DuckDuckGo's `GET /` on one port.
pub struct MockSearchServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedSearchRequest>>>,
}

impl MockSearchServer {
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Answers every request with the given status and body.
    pub async fn start_failing(status: u16, body: Value) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        Self::start_with(Some((status, body))).await
    }

    async fn start_with(failure: Option<(StatusCode, Value)>) -> Self {
        let state = MockSearchState {
            requests: Arc::new(Mutex::new(Vec::new())),
            failure,
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/search", post(tavily_handler))
            .route("/", get(duckduckgo_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock search server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock search server error: {}", e);
                });
        });

        MockSearchServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recorded_requests(&self) -> Vec<RecordedSearchRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock search server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
}
