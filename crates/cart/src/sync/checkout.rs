//! Turning the cart into an order.

use kubti_core::{CartEntry, DeliveryAddress, DirectOrderRequest, Order};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{CartSync, RemoteClear};
use crate::error::{CartError, Result, add_breadcrumb};

/// Which order endpoint a cart is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutRoute {
    /// Every entry is server-backed; the backend builds the order from its
    /// own cart.
    ServerCart,
    /// At least one entry is local; line items are sent explicitly.
    Direct,
}

impl CheckoutRoute {
    /// Route for the given entries.
    #[must_use]
    pub fn for_entries(entries: &[CartEntry]) -> Self {
        if entries.iter().all(|e| matches!(e, CartEntry::Server(_))) {
            Self::ServerCart
        } else {
            Self::Direct
        }
    }
}

impl CartSync {
    /// Place an order for everything in the view.
    ///
    /// On success the cart is cleared. A failure to clear afterwards is
    /// logged and does not affect the returned order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EmptyCart` if the view is empty, or the backend's
    /// error if the order is rejected. The cart is left untouched on error.
    #[instrument(skip(self, address))]
    pub async fn place_order(&self, address: DeliveryAddress) -> Result<Order> {
        let entries = self.entries().await;
        if entries.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let route = CheckoutRoute::for_entries(&entries);
        let order = match route {
            CheckoutRoute::ServerCart => self.inner.remote.place_order(&address).await,
            CheckoutRoute::Direct => {
                let request = DirectOrderRequest::from_entries(address, &entries);
                self.inner.remote.place_direct_order(&request).await
            }
        }
        .inspect_err(|e| warn!(route = ?route, error = %e, "Order rejected"))?;

        info!(
            order_id = %order.id,
            order_number = order.order_number.as_deref().unwrap_or_default(),
            route = ?route,
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", &order.id.to_string())]),
        );

        match self.clear().await {
            Ok(RemoteClear::Failed(reason)) => {
                warn!(order_id = %order.id, reason = %reason, "Order placed but server cart was not cleared");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Order placed but local cart was not cleared");
            }
        }

        Ok(order)
    }
}
