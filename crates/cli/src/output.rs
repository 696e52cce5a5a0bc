//! Plain-text rendering of carts and orders.

use kubti_cart::{EntryStatus, ViewEntry};
use kubti_core::{CartTotals, Order, Price, Provenance};
use rust_decimal::Decimal;

const NAME_WIDTH: usize = 28;

fn money(amount: Decimal) -> String {
    Price::store(amount).display()
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Table of cart entries followed by totals.
#[must_use]
pub fn cart(view: &[ViewEntry], totals: &CartTotals) -> String {
    if view.is_empty() {
        return "Your cart is empty".to_string();
    }

    let mut lines = vec![format!(
        "{:<22} {:<NAME_WIDTH$} {:>4} {:>10} {:>11}  SOURCE",
        "KEY", "ITEM", "QTY", "PRICE", "TOTAL"
    )];
    for ViewEntry { entry, status } in view {
        let name = entry.selected_size().map_or_else(
            || entry.name().to_string(),
            |size| format!("{} ({size})", entry.name()),
        );
        let source = match entry.provenance() {
            Provenance::Server => "server",
            Provenance::Local => "local",
        };
        let marker = match status {
            EntryStatus::Settled => "",
            EntryStatus::Pending { .. } => " *",
        };
        lines.push(format!(
            "{:<22} {:<NAME_WIDTH$} {:>4} {:>10} {:>11}  {source}{marker}",
            entry.key().to_string(),
            truncate(&name, NAME_WIDTH),
            entry.quantity().get(),
            money(entry.effective_unit_price()),
            money(entry.line_total()),
        ));
    }

    lines.push(String::new());
    if totals.total_discount > Decimal::ZERO {
        lines.push(format!("You save: {}", money(totals.total_discount)));
    }
    lines.push(format!("Items:    {}", totals.item_count));
    lines.push(format!("Total:    {}", money(totals.total)));
    lines.join("\n")
}

/// Summary of a placed order.
#[must_use]
pub fn order(order: &Order) -> String {
    let number = order
        .order_number
        .clone()
        .unwrap_or_else(|| format!("#{}", order.id));
    let mut lines = vec![
        format!("Order placed: {number}"),
        format!("Status:       {}", order.status),
        format!("Total:        {}", money(order.total_amount)),
    ];
    if order.discount_amount > Decimal::ZERO {
        lines.push(format!("Saved:        {}", money(order.discount_amount)));
    }
    if order.points_earned > 0 {
        lines.push(format!("Points:       +{}", order.points_earned));
    }
    lines.push(format!("Deliver to:   {}", order.delivery_address));
    lines.join("\n")
}
