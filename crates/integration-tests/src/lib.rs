//! Integration tests for the Kubti cart client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kubti-integration-tests
//! ```
//!
//! Tests run the real [`kubti_cart::ApiClient`] against [`MockBackend`], an
//! in-process HTTP server bound to a random loopback port that mimics the
//! store's cart and order endpoints.

use std::collections::VecDeque;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use kubti_cart::config::ConfigError;
use kubti_cart::{ApiClient, CartConfig, SessionProvider};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

/// Token the mock backend accepts.
pub const VALID_TOKEN: &str = "test-token";

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// A canned response returned instead of normal handling.
#[derive(Debug, Clone)]
pub struct Failure {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub body: String,
    pub content_type: &'static str,
}

impl Failure {
    /// JSON error body with a `detail` message.
    #[must_use]
    pub fn detail(method: Method, path: &str, status: StatusCode, detail: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: json!({ "detail": detail }).to_string(),
            content_type: "application/json",
        }
    }

    /// Body that is not JSON at all, as sent by a proxy.
    #[must_use]
    pub fn html(method: Method, path: &str, status: StatusCode) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: "<html><body>Bad Gateway</body></html>".to_string(),
            content_type: "text/html",
        }
    }

    /// Arbitrary JSON body.
    #[must_use]
    pub fn json(method: Method, path: &str, status: StatusCode, body: &Value) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
            content_type: "application/json",
        }
    }
}

#[derive(Debug, Default)]
struct BackendState {
    items: Vec<Value>,
    requests: Vec<RecordedRequest>,
    failures: VecDeque<Failure>,
    next_id: i64,
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-process stand-in for the store backend.
pub struct MockBackend {
    url: Url,
    state: Arc<Mutex<BackendState>>,
    server: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    /// Start serving on a random loopback port.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(BackendState {
            next_id: 1,
            ..BackendState::default()
        }));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}/"))
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(Self { url, state, server })
    }

    /// Base URL of the backend.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration cannot be built.
    pub fn config(&self) -> Result<CartConfig, ConfigError> {
        let url = self.url.to_string();
        CartConfig::from_lookup(|key| match key {
            "KUBTI_API_URL" => Some(url.clone()),
            "KUBTI_REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
    }

    /// API client for this backend using the given session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or HTTP client cannot be built.
    pub fn client(
        &self,
        session: Arc<dyn SessionProvider>,
    ) -> Result<ApiClient, Box<dyn std::error::Error>> {
        Ok(ApiClient::new(&self.config()?, session)?)
    }

    /// Put a line in the server cart and return its cart item ID.
    pub async fn seed_item(&self, product_id: i64, name: &str, price: f64, quantity: u32) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state
            .items
            .push(cart_item(id, product_id, name, price, quantity, None));
        id
    }

    /// Answer the next matching request with a canned failure.
    pub async fn fail_next(&self, failure: Failure) {
        self.state.lock().await.failures.push_back(failure);
    }

    /// All requests received so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Requests received for the given method and path.
    pub async fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    /// Current server cart lines as JSON.
    pub async fn items(&self) -> Vec<Value> {
        self.state.lock().await.items.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Request Handling
// =============================================================================

async fn handle(
    State(state): State<Arc<Mutex<BackendState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = serde_json::from_slice::<Value>(&body).ok();

    let mut state = state.lock().await;
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    let expected = format!("Bearer {VALID_TOKEN}");
    if authorization.as_deref() != Some(expected.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }

    if let Some(index) = state
        .failures
        .iter()
        .position(|f| f.method == method && f.path == path)
        && let Some(failure) = state.failures.remove(index)
    {
        return (
            failure.status,
            [(header::CONTENT_TYPE, failure.content_type)],
            failure.body,
        )
            .into_response();
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::GET, ["api", "cart"]) => axum::Json(Value::Array(state.items.clone())).into_response(),
        (Method::POST, ["api", "cart"]) => add_item(&mut state, body.as_ref()),
        (Method::DELETE, ["api", "cart"]) => {
            state.items.clear();
            axum::Json(json!({ "message": "Cart cleared" })).into_response()
        }
        (Method::PUT, ["api", "cart", id]) => update_item(&mut state, id, body.as_ref()),
        (Method::DELETE, ["api", "cart", id]) => {
            let before = state.items.len();
            state.items.retain(|item| item["id"].to_string() != *id);
            if state.items.len() == before {
                error(StatusCode::NOT_FOUND, "Cart item not found")
            } else {
                axum::Json(json!({ "message": "Item removed from cart" })).into_response()
            }
        }
        (Method::POST, ["api", "orders"]) => {
            if state.items.is_empty() {
                return error(StatusCode::BAD_REQUEST, "Cart is empty");
            }
            let total: f64 = state
                .items
                .iter()
                .filter_map(|item| Some(item["product"]["price"].as_f64()? * item["quantity"].as_f64()?))
                .sum();
            state.items.clear();
            axum::Json(order(1, total, body.as_ref())).into_response()
        }
        (Method::POST, ["api", "orders", "direct"]) => {
            let total = body
                .as_ref()
                .and_then(|b| b["total_amount"].as_f64())
                .unwrap_or_default();
            axum::Json(order(2, total, body.as_ref())).into_response()
        }
        _ => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn add_item(state: &mut BackendState, body: Option<&Value>) -> Response {
    let (Some(product_id), Some(quantity)) = (
        body.and_then(|b| b["product_id"].as_i64()),
        body.and_then(|b| b["quantity"].as_u64()),
    ) else {
        let detail = json!({ "detail": [{ "loc": ["body", "product_id"], "msg": "field required" }] });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(detail)).into_response();
    };
    let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
    let size = body
        .and_then(|b| b["selected_size"].as_str())
        .map(String::from);

    if let Some(existing) = state
        .items
        .iter_mut()
        .find(|item| item["product_id"].as_i64() == Some(product_id))
    {
        let total = existing["quantity"].as_u64().unwrap_or_default() + u64::from(quantity);
        existing["quantity"] = json!(total);
        return axum::Json(existing.clone()).into_response();
    }

    let id = state.next_id;
    state.next_id += 1;
    let item = cart_item(id, product_id, "Store product", 120.0, quantity, size);
    state.items.push(item.clone());
    axum::Json(item).into_response()
}

fn update_item(state: &mut BackendState, id: &str, body: Option<&Value>) -> Response {
    let Some(quantity) = body.and_then(|b| b["quantity"].as_u64()) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "quantity is required");
    };
    let Some(item) = state
        .items
        .iter_mut()
        .find(|item| item["id"].to_string() == id)
    else {
        return error(StatusCode::NOT_FOUND, "Cart item not found");
    };
    item["quantity"] = json!(quantity);
    // The update response carries no selected size.
    let mut response = item.clone();
    if let Some(object) = response.as_object_mut() {
        object.remove("selected_size");
    }
    axum::Json(response).into_response()
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, axum::Json(json!({ "detail": detail }))).into_response()
}

fn cart_item(
    id: i64,
    product_id: i64,
    name: &str,
    price: f64,
    quantity: u32,
    size: Option<String>,
) -> Value {
    json!({
        "id": id,
        "product_id": product_id,
        "quantity": quantity,
        "selected_size": size,
        "product": {
            "id": product_id,
            "name": name,
            "price": price,
            "original_price": null,
            "discount_percent": null,
            "image_path": format!("/static/products/{product_id}.jpg"),
            "size": "1L",
            "stock": 25
        },
        "subtotal": price * f64::from(quantity)
    })
}

fn order(id: i64, total: f64, body: Option<&Value>) -> Value {
    let address = body
        .and_then(|b| b["delivery_address"].as_str())
        .unwrap_or_default();
    json!({
        "id": id,
        "user_id": 7,
        "order_number": format!("KB-{id:05}"),
        "total_amount": total,
        "original_amount": total,
        "discount_amount": 0.0,
        "status": "pending",
        "delivery_address": address,
        "points_earned": 0,
        "created_at": "2026-10-14T09:30:00.123456",
        "order_items": []
    })
}
