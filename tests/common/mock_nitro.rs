//! Mock NITRO endpoint for testing the HTTP gateway.
//!
//! Runs an axum server on its own tokio runtime so the blocking client
//! under test can be driven from a plain `#[test]`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

/// A captured request for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

/// A mock response to return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::json(r#"{"errorcode": 0, "message": "Done", "severity": "NONE"}"#)
    }
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn created() -> Self {
        Self {
            status: 201,
            body: String::new(),
        }
    }

    pub fn nitro_error(status: u16, errorcode: i64, message: &str) -> Self {
        Self {
            status,
            body: format!(
                r#"{{"errorcode": {}, "message": "{}", "severity": "ERROR"}}"#,
                errorcode, message
            ),
        }
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
}

/// Mock appliance server for testing.
pub struct MockNitro {
    pub addr: SocketAddr,
    state: MockState,
    shutdown: tokio::sync::watch::Sender<bool>,
    _runtime: Runtime,
}

impl MockNitro {
    /// Start a new mock appliance.
    pub fn start() -> Self {
        let runtime = Runtime::new().expect("Failed to build runtime");
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/{*path}", any(handle_request))
            .with_state(state.clone());

        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().unwrap();

        runtime.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
            _runtime: runtime,
        }
    }

    /// Enqueue a response to be returned for the next request.
    pub fn enqueue(&self, resp: MockResponse) {
        self.state.responses.lock().push_back(resp);
    }

    /// Get all captured requests.
    pub fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().clone()
    }

    /// The single request captured so far.
    pub fn only_request(&self) -> CapturedRequest {
        let requests = self.captured_requests();
        assert_eq!(requests.len(), 1, "expected exactly one request: {:?}", requests);
        requests[0].clone()
    }

    /// Endpoint in the form the appliance config takes.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockNitro {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_request(State(state): State<MockState>, req: Request<Body>) -> Response<Body> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .unwrap_or_default()
        .to_vec();

    state.requests.lock().push(CapturedRequest {
        method,
        path,
        query,
        headers,
        body,
    });

    let mock = state.responses.lock().pop_front().unwrap_or_default();

    Response::builder()
        .status(StatusCode::from_u16(mock.status).unwrap())
        .header("content-type", "application/json")
        .body(Body::from(mock.body))
        .unwrap()
}
