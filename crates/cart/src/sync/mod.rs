//! Reconciliation of the server cart and the local cart into one view.
//!
//! # Architecture
//!
//! - Each entry is owned by exactly one store: the backend cart service or
//!   on-device storage. Every mutation is routed to the owner.
//! - Mutations are applied to the view before the owner confirms them. On
//!   failure the entry is put back exactly as it was; other entries are
//!   untouched.
//! - Mutations on the same entry run one at a time, in the order issued.
//! - Totals are folded from the view on every call and never stored.
//! - Once [`CartSync::detach`] is called, late results leave the view alone.
//!
//! # Example
//!
//! ```rust,ignore
//! let cart = CartSync::new(Arc::new(api_client), LocalCart::new(store));
//! cart.load().await;
//! cart.update_quantity(&key, 3).await?;
//! let totals = cart.totals().await;
//! ```

mod checkout;
mod locks;
mod view;

pub use checkout::CheckoutRoute;
pub use view::{EntryStatus, ViewEntry};

use std::sync::Arc;

use kubti_core::{
    CartEntry, CartTotals, EntryKey, LocalCartItem, NewCartItem, Quantity, ServerCartItem,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{CartError, Result, add_breadcrumb};
use crate::remote::CartRemote;
use crate::store::LocalCart;

use locks::EntryLocks;
use view::{CartView, Snapshot};

/// What happened to the server cart during [`CartSync::clear`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "remote", content = "error", rename_all = "snake_case")]
pub enum RemoteClear {
    /// The view held no server entries, so the backend was not called.
    Skipped,
    Cleared,
    /// The backend call failed; the view and local cart are cleared anyway.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Update,
    Remove,
}

impl Mutation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

// =============================================================================
// CartSync
// =============================================================================

/// The unified cart.
///
/// Cloning is cheap and every clone shares the same view.
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<CartSyncInner>,
}

struct CartSyncInner {
    remote: Arc<dyn CartRemote>,
    local: LocalCart,
    view: Mutex<CartView>,
    locks: EntryLocks,
}

impl CartSync {
    #[must_use]
    pub fn new(remote: Arc<dyn CartRemote>, local: LocalCart) -> Self {
        Self {
            inner: Arc::new(CartSyncInner {
                remote,
                local,
                view: Mutex::new(CartView::new()),
                locks: EntryLocks::default(),
            }),
        }
    }

    /// The on-device cart backing local entries.
    #[must_use]
    pub fn local(&self) -> &LocalCart {
        &self.inner.local
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Fetch both stores and replace the view with server entries followed
    /// by local entries.
    ///
    /// Never fails. A server cart that cannot be fetched, including a 401,
    /// contributes nothing. If the view was detached while the fetch was in
    /// flight the result is returned but not shown.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Vec<CartEntry> {
        let (server, local) = tokio::join!(self.fetch_server_items(), self.inner.local.load());
        info!(server = server.len(), local = local.len(), "Loaded cart");

        let entries: Vec<CartEntry> = server
            .into_iter()
            .map(CartEntry::Server)
            .chain(local.into_iter().map(CartEntry::Local))
            .collect();

        let mut view = self.inner.view.lock().await;
        if view.is_attached() {
            view.replace(entries.clone());
        } else {
            debug!("Cart view detached, discarding loaded cart");
        }
        entries
    }

    async fn fetch_server_items(&self) -> Vec<ServerCartItem> {
        match self.inner.remote.fetch_cart().await {
            Ok(items) => items,
            Err(e) if e.is_auth() => {
                debug!(error = %e, "Not signed in, server cart is empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch server cart, showing local items only");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item to the store it belongs to and show the resulting line.
    ///
    /// Server lines are shown once the backend returns them; there is no
    /// optimistic server add. Local lines merge with an existing line of
    /// the same ID.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` or `CartError::Storage` if the owning
    /// store rejects the add. The view is unchanged in that case.
    #[instrument(skip(self, item), fields(provenance = ?item.provenance()))]
    pub async fn add(&self, item: NewCartItem) -> Result<CartEntry> {
        let (entry, _guard) = match item {
            NewCartItem::Server {
                product_id,
                quantity,
                selected_size,
            } => {
                let line = self
                    .inner
                    .remote
                    .add_item(product_id, quantity, selected_size.as_deref())
                    .await
                    .inspect_err(|e| warn!(error = %e, %product_id, "Failed to add item"))?;
                (CartEntry::Server(line), None)
            }
            NewCartItem::Local(item) => {
                let guard = self
                    .inner
                    .locks
                    .acquire(&EntryKey::Local(item.id.clone()))
                    .await;
                let line = self.inner.local.add(item).await?;
                (CartEntry::Local(line), Some(guard))
            }
        };

        let key = entry.key().to_string();
        {
            let mut view = self.inner.view.lock().await;
            if view.is_attached() {
                view.upsert(entry.clone());
            }
        }
        add_breadcrumb("cart", "Added item", Some(&[("item", &key)]));
        info!(item = %key, quantity = %entry.quantity(), "Added item to cart");
        Ok(entry)
    }

    /// Set an entry's quantity. A requested quantity below 1 removes it.
    ///
    /// The view shows the new quantity immediately. If the owning store
    /// rejects it, the entry is restored to exactly its prior state.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the view has no such entry, or the
    /// owning store's error after rolling back.
    #[instrument(skip(self), fields(item = %key))]
    pub async fn update_quantity(&self, key: &EntryKey, requested: i64) -> Result<()> {
        let Some(quantity) = Quantity::from_requested(requested)? else {
            return self.remove(key).await;
        };

        let _guard = self.inner.locks.acquire(key).await;
        let (snapshot, generation) = {
            let mut view = self.inner.view.lock().await;
            let snapshot = view
                .snapshot(key)
                .ok_or_else(|| CartError::NotInCart(key.clone()))?;
            view.begin_update(key, quantity);
            (snapshot, view.generation())
        };

        let result = match &snapshot.entry.entry {
            CartEntry::Server(item) => self
                .inner
                .remote
                .update_quantity(item.id, quantity)
                .await
                .map(|_| ())
                .map_err(CartError::from),
            CartEntry::Local(item) => self.update_local(item, quantity, generation).await,
        };

        self.finish(Mutation::Update, snapshot, generation, &result)
            .await;
        result
    }

    /// Write a local quantity change.
    ///
    /// A line missing from storage is put back only while the view still
    /// accepts `generation`. The view lock is held across that write so a
    /// concurrent `clear` cannot slip in between the check and the insert.
    async fn update_local(
        &self,
        item: &LocalCartItem,
        quantity: Quantity,
        generation: u64,
    ) -> Result<()> {
        if self.inner.local.set_quantity(&item.id, quantity).await? {
            return Ok(());
        }

        let view = self.inner.view.lock().await;
        if !view.accepts(generation) {
            debug!(item = %item.id, "Cart view moved on, not restoring missing local line");
            return Ok(());
        }
        let mut line = item.clone();
        line.quantity = quantity;
        self.inner
            .local
            .update(move |items| {
                if !items.iter().any(|i| i.id == line.id) {
                    items.push(line);
                }
            })
            .await?;
        drop(view);
        Ok(())
    }

    /// Remove an entry.
    ///
    /// The entry disappears from the view immediately. If the owning store
    /// rejects the removal, it reappears at its old position.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the view has no such entry, or the
    /// owning store's error after rolling back.
    #[instrument(skip(self), fields(item = %key))]
    pub async fn remove(&self, key: &EntryKey) -> Result<()> {
        let _guard = self.inner.locks.acquire(key).await;
        let (snapshot, generation) = {
            let mut view = self.inner.view.lock().await;
            let snapshot = view
                .snapshot(key)
                .ok_or_else(|| CartError::NotInCart(key.clone()))?;
            view.remove(key);
            (snapshot, view.generation())
        };

        let result = match &snapshot.entry.entry {
            CartEntry::Server(item) => self
                .inner
                .remote
                .remove_item(item.id)
                .await
                .map(|_| ())
                .map_err(CartError::from),
            CartEntry::Local(item) => self
                .inner
                .local
                .remove(&item.id)
                .await
                .map(|_| ())
                .map_err(CartError::from),
        };

        self.finish(Mutation::Remove, snapshot, generation, &result)
            .await;
        result
    }

    /// Settle or roll back an optimistic change once its store has answered.
    async fn finish(
        &self,
        mutation: Mutation,
        snapshot: Snapshot,
        generation: u64,
        result: &Result<()>,
    ) {
        let key = snapshot.entry.entry.key();
        let mut view = self.inner.view.lock().await;
        if !view.accepts(generation) {
            debug!(item = %key, mutation = mutation.as_str(), "Cart view moved on, ignoring late result");
            return;
        }

        match result {
            Ok(()) => {
                if mutation == Mutation::Update {
                    view.settle(&key);
                }
            }
            Err(e) => {
                warn!(
                    item = %key,
                    mutation = mutation.as_str(),
                    error = %e,
                    "Cart change rejected, rolling back"
                );
                add_breadcrumb(
                    "cart",
                    "Rolled back cart change",
                    Some(&[("item", &key.to_string()), ("mutation", mutation.as_str())]),
                );
                view.restore(snapshot);
            }
        }
    }

    /// Empty the view and the local cart, and the server cart if the view
    /// held any server entries.
    ///
    /// A failed server clear is logged and reported in the outcome; the
    /// view and local cart stay cleared.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the empty local cart cannot be
    /// written.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<RemoteClear> {
        let had_server = {
            let mut view = self.inner.view.lock().await;
            let had_server = view
                .entries()
                .iter()
                .any(|e| matches!(e.entry, CartEntry::Server(_)));
            view.clear();
            had_server
        };

        let local_result = self.inner.local.clear().await;

        let remote = if had_server {
            match self.inner.remote.clear_cart().await {
                Ok(_) => RemoteClear::Cleared,
                Err(e) => {
                    warn!(error = %e, "Failed to clear server cart");
                    RemoteClear::Failed(e.to_string())
                }
            }
        } else {
            RemoteClear::Skipped
        };

        local_result?;
        info!(remote = ?remote, "Cleared cart");
        Ok(remote)
    }

    // =========================================================================
    // View Accessors
    // =========================================================================

    /// Current entries in display order.
    pub async fn entries(&self) -> Vec<CartEntry> {
        self.inner.view.lock().await.cart_entries()
    }

    /// Current entries with their settled or pending status.
    pub async fn view(&self) -> Vec<ViewEntry> {
        self.inner.view.lock().await.entries().to_vec()
    }

    /// Status of one entry, if it is in the view.
    pub async fn status(&self, key: &EntryKey) -> Option<EntryStatus> {
        self.inner
            .view
            .lock()
            .await
            .get(key)
            .map(|entry| entry.status)
    }

    /// Totals folded from the current view.
    pub async fn totals(&self) -> CartTotals {
        self.inner.view.lock().await.totals()
    }

    /// Sum of discounted line totals over the current view.
    pub async fn subtotal(&self) -> Decimal {
        self.totals().await.subtotal
    }

    /// Stop applying results to the view, for when nothing displays it.
    pub async fn detach(&self) {
        self.inner.view.lock().await.detach();
        debug!("Cart view detached");
    }

    /// Resume applying results to the view. Call [`CartSync::load`] after
    /// attaching to pick up changes missed while detached.
    pub async fn attach(&self) {
        self.inner.view.lock().await.attach();
    }
}
