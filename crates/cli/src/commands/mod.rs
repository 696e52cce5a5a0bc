//! Command implementations.
//!
//! Each command returns the text to print on success.

pub mod cart;
pub mod checkout;
pub mod session;

use std::sync::Arc;

use kubti_cart::{ApiClient, CartConfig, CartSync, FileStore, KeyValueStore, LocalCart, StoredSession};
use tracing::debug;

use crate::error::CliError;

/// Everything a command needs, built from configuration.
pub struct Context {
    pub store: Arc<dyn KeyValueStore>,
    pub session: StoredSession,
}

impl Context {
    /// Open the data directory.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Store` if the directory cannot be created.
    pub async fn open(config: &CartConfig) -> Result<Self, CliError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir).await?);
        debug!(data_dir = %config.data_dir.display(), "Opened data directory");
        Ok(Self {
            session: StoredSession::new(Arc::clone(&store)),
            store,
        })
    }

    /// Build the cart and load it from both stores.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Remote` if the HTTP client cannot be built.
    pub async fn loaded_cart(&self, config: &CartConfig) -> Result<CartSync, CliError> {
        let client = ApiClient::new(config, Arc::new(self.session.clone()))?;
        let cart = CartSync::new(Arc::new(client), LocalCart::new(Arc::clone(&self.store)));
        cart.load().await;
        Ok(cart)
    }
}
