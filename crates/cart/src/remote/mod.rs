//! Backend cart and order service.
//!
//! # Endpoints
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | Fetch cart | GET | `/api/cart` |
//! | Add item | POST | `/api/cart` |
//! | Update quantity | PUT | `/api/cart/{id}` |
//! | Remove item | DELETE | `/api/cart/{id}` |
//! | Clear cart | DELETE | `/api/cart` |
//! | Place order from server cart | POST | `/api/orders` |
//! | Place order with explicit items | POST | `/api/orders/direct` |
//!
//! Every request carries `Authorization: Bearer <token>`. Error responses are
//! expected to carry a JSON `detail` field with a human-readable message.

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::Confirmation;

use async_trait::async_trait;
use kubti_core::{
    CartItemId, DeliveryAddress, DirectOrderRequest, Order, ProductId, Quantity, ServerCartItem,
};
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No response was received (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session has no access token, so no request was sent.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend rejected the access token (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Non-success response with a message meant for the user.
    #[error("{detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The backend's `detail`, or a generic message if it sent none.
        detail: String,
    },

    /// Success response whose body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RemoteError {
    /// Whether the failure is an authentication problem.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::Unauthorized(_))
    }
}

/// Operations offered by the backend cart and order service.
#[async_trait]
pub trait CartRemote: Send + Sync {
    /// Fetch the caller's server cart.
    async fn fetch_cart(&self) -> Result<Vec<ServerCartItem>, RemoteError>;

    /// Add a product. The backend merges into an existing line for the
    /// same product and returns the resulting line.
    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
        selected_size: Option<&str>,
    ) -> Result<ServerCartItem, RemoteError>;

    /// Set the quantity of a server cart line.
    async fn update_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<ServerCartItem, RemoteError>;

    /// Delete a server cart line.
    async fn remove_item(&self, id: CartItemId) -> Result<Confirmation, RemoteError>;

    /// Delete every line of the server cart.
    async fn clear_cart(&self) -> Result<Confirmation, RemoteError>;

    /// Turn the server cart into an order.
    async fn place_order(&self, address: &DeliveryAddress) -> Result<Order, RemoteError>;

    /// Create an order from explicit line items.
    async fn place_direct_order(&self, request: &DirectOrderRequest) -> Result<Order, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_detail_verbatim() {
        let err = RemoteError::Api {
            status: 400,
            detail: "Insufficient stock".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient stock");
    }

    #[test]
    fn test_is_auth() {
        assert!(RemoteError::NotAuthenticated.is_auth());
        assert!(RemoteError::Unauthorized("expired".to_string()).is_auth());
        assert!(
            !RemoteError::Api {
                status: 404,
                detail: "Cart item not found".to_string()
            }
            .is_auth()
        );
    }
}
