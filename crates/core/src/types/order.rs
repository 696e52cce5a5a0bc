//! Order placement types.
//!
//! Two backend endpoints create orders:
//!
//! - `POST /api/orders` turns the caller's server cart into an order. The
//!   request only carries the delivery address.
//! - `POST /api/orders/direct` accepts explicit line items. It is required as
//!   soon as any line lives only on the device.

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::cart::CartEntry;
use super::id::{OrderId, OrderItemId, ProductId, UserId};
use super::status::OrderStatus;

/// Size recorded for lines that never had one selected.
pub const DEFAULT_SIZE_ORDERED: &str = "1L";

/// Delivery details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_state: String,
    pub delivery_pincode: String,
    pub delivery_phone: String,
}

/// One explicit line of a direct order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemInput {
    /// Backend product, when the line refers to one. Local lines carry
    /// their catalog ID here when it is numeric.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub size_ordered: String,
}

impl From<&CartEntry> for OrderItemInput {
    fn from(entry: &CartEntry) -> Self {
        let product_id = match entry {
            CartEntry::Server(item) => Some(item.product.id),
            CartEntry::Local(item) => item.id.catalog_product_id(),
        };
        Self {
            product_id,
            product_name: entry.name().to_string(),
            quantity: entry.quantity().get(),
            price: entry.price(),
            size_ordered: entry
                .selected_size()
                .unwrap_or(DEFAULT_SIZE_ORDERED)
                .to_string(),
        }
    }
}

/// Request body for `POST /api/orders/direct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectOrderRequest {
    #[serde(flatten)]
    pub address: DeliveryAddress,
    pub items: Vec<OrderItemInput>,
    /// Sum of listed `price * quantity`. The backend recomputes its own
    /// figures; this value is what the customer saw.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl DirectOrderRequest {
    /// Build a direct order from cart entries.
    #[must_use]
    pub fn from_entries(address: DeliveryAddress, entries: &[CartEntry]) -> Self {
        let items: Vec<OrderItemInput> = entries.iter().map(OrderItemInput::from).collect();
        let total_amount = items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        Self {
            address,
            items,
            total_amount,
        }
    }
}

/// An order line as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    #[serde(default)]
    pub product_image: Option<String>,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_at_purchase: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    #[serde(default)]
    pub discount_percent: u32,
    #[serde(default)]
    pub size_ordered: Option<String>,
}

/// An order as returned by the backend after placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    pub delivery_address: String,
    #[serde(default)]
    pub points_earned: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

/// Accept both RFC 3339 timestamps and the backend's naive ISO timestamps.
fn deserialize_lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.naive_utc()));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(Some)
        .map_err(serde::de::Error::custom)
}
