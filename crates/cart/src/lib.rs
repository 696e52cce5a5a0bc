//! Kubti cart client.
//!
//! Reconciles the shopper's server cart with the cart kept on the device
//! and presents both as one list.
//!
//! # Modules
//!
//! - [`remote`] - Backend cart and order endpoints
//! - [`store`] - On-device key-value storage and the local cart
//! - [`session`] - Access token source for backend requests
//! - [`sync`] - The unified view with optimistic mutations and checkout
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error type and Sentry breadcrumbs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::CartConfig;
pub use error::{CartError, Result};
pub use remote::{ApiClient, CartRemote, RemoteError};
pub use session::{SessionProvider, StaticSession, StoredSession, UserProfile};
pub use store::{FileStore, KeyValueStore, LocalCart, MemoryStore};
pub use sync::{CartSync, CheckoutRoute, EntryStatus, RemoteClear, ViewEntry};
