//! On-device key-value storage.
//!
//! # Keys
//!
//! - `cart` - JSON array of local-only cart items (see [`LocalCart`])
//! - `access_token` - Bearer token of the signed-in user
//! - `user` - Cached JSON profile of the signed-in user
//!
//! Values are opaque strings. Each key is written as a whole; there are no
//! partial updates, so the last writer of a key wins.

mod file;
mod local_cart;
mod memory;

pub use file::FileStore;
pub use local_cart::LocalCart;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Key for the serialized local cart.
    pub const CART: &str = "cart";

    /// Key for the bearer token of the current session.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the cached user profile.
    pub const USER: &str = "user";
}

/// Errors that can occur when reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded for storage.
    #[error("storage encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Key contains characters the backend cannot store.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Asynchronous string key-value storage that survives restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }
}
