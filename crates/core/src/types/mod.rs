//! Core types for Kubti.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod order;
pub mod price;
pub mod status;
pub mod totals;

pub use cart::{
    CartEntry, CartEntryError, CatalogId, CatalogProduct, EntryKey, LOCAL_KEY_PREFIX, LocalCartItem,
    LocalItemId, NewCartItem, ProductRef, Provenance, Quantity, ServerCartItem,
};
pub use id::*;
pub use order::{DeliveryAddress, DirectOrderRequest, Order, OrderItem, OrderItemInput};
pub use price::{CurrencyCode, Price};
pub use status::*;
pub use totals::{CartTotals, subtotal};
