//! Integration tests for the StreetGasm dashboard.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p streetgasm-integration-tests
//! ```
//!
//! No external services are needed. Each test starts a [`MockServer`] on
//! `127.0.0.1:0` standing in for the commerce API or the auxiliary store,
//! scripts its responses, and inspects the requests it received.
//!
//! # Test Categories
//!
//! - `commerce_gateway` - Query encoding, envelopes, single-record fetches, errors
//! - `query_client` - Retries, caching, members and the dashboard snapshot
//! - `aux_store` - Preferences, favorites, activity log and approvals

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
struct MockResponse {
    status: StatusCode,
    body: Value,
}

type RouteKey = (Method, String);

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<RouteKey, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process HTTP server with scripted responses.
///
/// Responses registered for the same method and path are served in order;
/// the last one keeps being served once the others are used up. Requests
/// without a scripted response get `404 {"error": "no mock for ..."}`.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log_server_error(&e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:51234`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Script a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(MockResponse { status, body });
    }

    /// Script a `200` JSON response for `GET path`.
    pub fn get(&self, path: &str, body: Value) {
        self.respond(Method::GET, path, 200, body);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests received for `method path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path == path)
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query: uri.query().map(str::to_string),
            headers,
            body: serde_json::from_slice(&body).ok(),
        });

    let scripted = {
        let mut routes = state.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes.get_mut(&(method.clone(), path.clone())).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match scripted {
        Some(response) => (response.status, axum::Json(response.body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": format!("no mock for {method} {path}") })),
        )
            .into_response(),
    }
}

#[allow(clippy::print_stderr)]
fn log_server_error(e: &std::io::Error) {
    eprintln!("mock server stopped: {e}");
}

/// Paginated envelope body.
#[must_use]
pub fn envelope(data: Value, total: u64, total_pages: u32, page: u32) -> Value {
    json!({ "data": data, "total": total, "totalPages": total_pages, "page": page })
}

/// A realistic subscription record.
#[must_use]
pub fn subscription_json(id: i64, first_name: &str, last_name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "customer_id": id + 1000,
        "status": status,
        "start_date": "2024-03-01T10:00:00",
        "next_payment_date": "2025-03-01T10:00:00",
        "date_created": "2024-02-28T09:30:00",
        "date_modified": "2024-09-12T18:45:00",
        "total": "149.00",
        "billing": {
            "first_name": first_name,
            "last_name": last_name,
            "email": format!("{}@example.nl", first_name.to_lowercase()),
            "phone": "+31612345678",
            "city": "Utrecht",
            "country": "NL"
        },
        "line_items": [
            {
                "id": 1,
                "name": "Gold Membership",
                "quantity": 1,
                "price": "149.00",
                "total": "149.00"
            }
        ],
        "auto": {"merk": "Porsche", "model": "911 GT3", "bouwjaar": "2021", "vermogen": "510"}
    })
}
