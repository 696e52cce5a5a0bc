//! The on-device cart list.

use std::sync::Arc;

use kubti_core::{LocalCartItem, LocalItemId, Quantity};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError, keys};

/// Local-only cart items persisted under the `cart` key.
///
/// Reads are tolerant: a missing key, a value that is not a JSON array, or
/// individual elements that fail to decode all read as absent rather than
/// failing. Every mutation rewrites the whole list under an internal lock,
/// so concurrent writers through the same `LocalCart` never interleave.
#[derive(Clone)]
pub struct LocalCart {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl LocalCart {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read the persisted list. Never fails; problems are logged.
    pub async fn load(&self) -> Vec<LocalCartItem> {
        match self.store.get(keys::CART).await {
            Ok(Some(raw)) => decode_items(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read local cart, treating as empty");
                Vec::new()
            }
        }
    }

    /// Read-modify-write the list under the write lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the rewritten list cannot be persisted.
    pub async fn update<T: Send>(
        &self,
        f: impl FnOnce(&mut Vec<LocalCartItem>) -> T + Send,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await;
        let result = f(&mut items);
        self.write(&items).await?;
        Ok(result)
    }

    /// Add an item, merging with an existing line of the same ID.
    ///
    /// Returns the stored line after the merge.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the list cannot be persisted.
    pub async fn add(&self, item: LocalCartItem) -> Result<LocalCartItem, StoreError> {
        self.update(move |items| {
            if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
                existing.merge(&item);
                existing.clone()
            } else {
                items.push(item.clone());
                item
            }
        })
        .await
    }

    /// Set the quantity of a line. Returns `false` if the line does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the list cannot be persisted.
    pub async fn set_quantity(
        &self,
        id: &LocalItemId,
        quantity: Quantity,
    ) -> Result<bool, StoreError> {
        self.update(|items| {
            items
                .iter_mut()
                .find(|i| &i.id == id)
                .map(|line| line.quantity = quantity)
                .is_some()
        })
        .await
    }

    /// Remove a line. Returns `false` if the line did not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the list cannot be persisted.
    pub async fn remove(&self, id: &LocalItemId) -> Result<bool, StoreError> {
        self.update(|items| {
            let before = items.len();
            items.retain(|i| &i.id != id);
            items.len() != before
        })
        .await
    }

    /// Persist an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the list cannot be persisted.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await
    }

    async fn write(&self, items: &[LocalCartItem]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(items)?;
        self.store.set(keys::CART, &encoded).await?;
        debug!(count = items.len(), "Persisted local cart");
        Ok(())
    }
}

/// Decode the stored list, dropping anything that does not parse.
fn decode_items(raw: &str) -> Vec<LocalCartItem> {
    let values = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(values)) => values,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Local cart is not a JSON array, treating as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Local cart is corrupt, treating as empty");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            serde_json::from_value::<LocalCartItem>(value)
                .map_err(|e| warn!(index, error = %e, "Skipping undecodable local cart item"))
                .ok()
        })
        .collect()
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
