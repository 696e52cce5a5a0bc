//! REST client for the backend cart and order endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use kubti_core::{
    CartItemId, DeliveryAddress, DirectOrderRequest, Order, ProductId, Quantity, ServerCartItem,
};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{AddToCartBody, Confirmation, UpdateQuantityBody, extract_detail};
use super::{CartRemote, RemoteError};
use crate::config::CartConfig;
use crate::session::SessionProvider;

const FETCH_FAILED: &str = "Failed to fetch cart";
const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update cart item";
const REMOVE_FAILED: &str = "Failed to remove item from cart";
const CLEAR_FAILED: &str = "Failed to clear cart";
const ORDER_FAILED: &str = "Failed to place order";

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the backend cart and order API.
///
/// The bearer token is read from the [`SessionProvider`] on every request.
/// When there is no token the request is not sent and
/// [`RemoteError::NotAuthenticated`] is returned.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    /// Create a client using the configured base URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: &CartConfig, session: Arc<dyn SessionProvider>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone(), session))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: Url,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                session,
            }),
        }
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Send an authenticated JSON request and decode the response.
    ///
    /// `fallback` is the message used when an error response carries no
    /// `detail`.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        fallback: &'static str,
    ) -> Result<T, RemoteError> {
        let token = self
            .inner
            .session
            .access_token()
            .await
            .ok_or(RemoteError::NotAuthenticated)?;
        let url = self.inner.base_url.join(path)?;

        let mut request = self
            .inner
            .client
            .request(method.clone(), url)
            .bearer_auth(token.expose_secret())
            .header("Content-Type", "application/json");
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            debug!(%method, path, "Backend rejected access token");
            return Err(RemoteError::Unauthorized(
                extract_detail(&response_text).unwrap_or_else(|| "Not authenticated".to_string()),
            ));
        }

        if !status.is_success() {
            tracing::error!(
                %method,
                path,
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(RemoteError::Api {
                status: status.as_u16(),
                detail: extract_detail(&response_text).unwrap_or_else(|| fallback.to_string()),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                %method,
                path,
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            RemoteError::Parse(e)
        })
    }
}

#[async_trait]
impl CartRemote for ApiClient {
    // =========================================================================
    // Cart Methods
    // =========================================================================

    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Vec<ServerCartItem>, RemoteError> {
        self.execute(Method::GET, "api/cart", None, FETCH_FAILED)
            .await
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
        selected_size: Option<&str>,
    ) -> Result<ServerCartItem, RemoteError> {
        let body = serde_json::to_value(AddToCartBody {
            product_id,
            quantity,
            selected_size,
        })?;
        self.execute(Method::POST, "api/cart", Some(body), ADD_FAILED)
            .await
    }

    #[instrument(skip(self), fields(cart_item_id = %id))]
    async fn update_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<ServerCartItem, RemoteError> {
        let body = serde_json::to_value(UpdateQuantityBody { quantity })?;
        self.execute(
            Method::PUT,
            &format!("api/cart/{id}"),
            Some(body),
            UPDATE_FAILED,
        )
        .await
    }

    #[instrument(skip(self), fields(cart_item_id = %id))]
    async fn remove_item(&self, id: CartItemId) -> Result<Confirmation, RemoteError> {
        self.execute(
            Method::DELETE,
            &format!("api/cart/{id}"),
            None,
            REMOVE_FAILED,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<Confirmation, RemoteError> {
        self.execute(Method::DELETE, "api/cart", None, CLEAR_FAILED)
            .await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    #[instrument(skip(self, address))]
    async fn place_order(&self, address: &DeliveryAddress) -> Result<Order, RemoteError> {
        let body = serde_json::to_value(address)?;
        self.execute(Method::POST, "api/orders", Some(body), ORDER_FAILED)
            .await
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn place_direct_order(&self, request: &DirectOrderRequest) -> Result<Order, RemoteError> {
        let body = serde_json::to_value(request)?;
        self.execute(Method::POST, "api/orders/direct", Some(body), ORDER_FAILED)
            .await
    }
}
