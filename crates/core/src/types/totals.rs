//! Derived cart totals.
//!
//! Totals are a pure fold over the current entries. They are never cached on
//! the view, so an optimistic mutation or rollback is reflected on the next
//! call without any invalidation step.

use rust_decimal::Decimal;
use serde::Serialize;

use super::cart::CartEntry;

/// Sum of `effective_unit_price * quantity` over all entries.
#[must_use]
pub fn subtotal(entries: &[CartEntry]) -> Decimal {
    entries.iter().map(CartEntry::line_total).sum()
}

/// Summary figures for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of discounted line totals.
    pub subtotal: Decimal,
    /// Savings against `original_price`, for lines marked down.
    pub total_discount: Decimal,
    /// Amount payable. Equal to the subtotal; shipping is not charged.
    pub total: Decimal,
    /// Number of units across all lines.
    pub item_count: u64,
}

impl CartTotals {
    /// Fold totals from the given entries.
    #[must_use]
    pub fn from_entries(entries: &[CartEntry]) -> Self {
        let subtotal = subtotal(entries);
        let total_discount = entries
            .iter()
            .filter_map(|entry| {
                let original = entry.original_price()?;
                (original > entry.price())
                    .then(|| (original - entry.price()) * Decimal::from(entry.quantity().get()))
            })
            .sum();
        let item_count = entries
            .iter()
            .map(|entry| u64::from(entry.quantity().get()))
            .sum();

        Self {
            subtotal,
            total_discount,
            total: subtotal,
            item_count,
        }
    }
}
