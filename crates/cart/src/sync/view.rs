//! The unified cart view shown to the shopper.

use kubti_core::{CartEntry, CartTotals, EntryKey, Quantity};
use serde::Serialize;

/// Whether an entry's displayed state has been confirmed by its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Displayed state matches the owning store as far as this client knows.
    Settled,
    /// A quantity change is in flight.
    Pending { quantity: Quantity },
}

/// One entry of the view with its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEntry {
    pub entry: CartEntry,
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl ViewEntry {
    #[must_use]
    pub const fn settled(entry: CartEntry) -> Self {
        Self {
            entry,
            status: EntryStatus::Settled,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, EntryStatus::Pending { .. })
    }
}

/// Position and contents of an entry before an optimistic change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: usize,
    pub entry: ViewEntry,
}

/// Ordered entries plus the bookkeeping that decides whether a late
/// response may still touch them.
#[derive(Debug)]
pub struct CartView {
    entries: Vec<ViewEntry>,
    /// Bumped whenever the entries are replaced wholesale.
    generation: u64,
    /// Cleared when the screen showing the cart goes away.
    attached: bool,
}

impl CartView {
    /// An empty, attached view.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
            attached: true,
        }
    }

    pub fn replace(&mut self, entries: Vec<CartEntry>) {
        self.entries = entries.into_iter().map(ViewEntry::settled).collect();
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    pub const fn detach(&mut self) {
        self.attached = false;
    }

    pub const fn attach(&mut self) {
        self.attached = true;
    }

    /// Whether a response for a change started at `generation` may be
    /// applied.
    pub const fn accepts(&self, generation: u64) -> bool {
        self.attached && self.generation == generation
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn position(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.entry.key() == key)
    }

    pub fn get(&self, key: &EntryKey) -> Option<&ViewEntry> {
        self.entries.iter().find(|e| &e.entry.key() == key)
    }

    pub fn snapshot(&self, key: &EntryKey) -> Option<Snapshot> {
        let index = self.position(key)?;
        self.entries.get(index).map(|entry| Snapshot {
            index,
            entry: entry.clone(),
        })
    }

    /// Show a pending quantity change for `key`.
    pub fn begin_update(&mut self, key: &EntryKey, quantity: Quantity) {
        if let Some(view_entry) = self.entries.iter_mut().find(|e| &e.entry.key() == key) {
            view_entry.entry = view_entry.entry.with_quantity(quantity);
            view_entry.status = EntryStatus::Pending { quantity };
        }
    }

    pub fn settle(&mut self, key: &EntryKey) {
        if let Some(view_entry) = self.entries.iter_mut().find(|e| &e.entry.key() == key) {
            view_entry.status = EntryStatus::Settled;
        }
    }

    pub fn remove(&mut self, key: &EntryKey) {
        self.entries.retain(|e| &e.entry.key() != key);
    }

    /// Put back exactly what the snapshot captured, at its old position.
    ///
    /// Other entries are left as they are now.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let key = snapshot.entry.entry.key();
        if let Some(index) = self.position(&key) {
            self.entries.remove(index);
        }
        let index = snapshot.index.min(self.entries.len());
        self.entries.insert(index, snapshot.entry);
    }

    /// Replace the entry with the same key in place, or insert it.
    ///
    /// New server entries go after the last server entry so the server
    /// block stays ahead of the local block; new local entries go last.
    pub fn upsert(&mut self, entry: CartEntry) {
        let key = entry.key();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.entry.key() == key) {
            *existing = ViewEntry::settled(entry);
            return;
        }
        let index = match &entry {
            CartEntry::Server(_) => self
                .entries
                .iter()
                .rposition(|e| matches!(e.entry, CartEntry::Server(_)))
                .map_or(0, |i| i + 1),
            CartEntry::Local(_) => self.entries.len(),
        };
        self.entries.insert(index, ViewEntry::settled(entry));
    }

    pub fn cart_entries(&self) -> Vec<CartEntry> {
        self.entries.iter().map(|e| e.entry.clone()).collect()
    }

    pub fn totals(&self) -> CartTotals {
        let entries = self.cart_entries();
        CartTotals::from_entries(&entries)
    }
}
