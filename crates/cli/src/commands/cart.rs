//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! kubti cart show
//! kubti cart add 42 --quantity 2 --size 4L
//! kubti cart add-local --id allwood-teak --name "Allwood Teak" --price 245
//! kubti cart set 17 3
//! kubti cart set allwood-teak 0
//! kubti cart remove 17
//! kubti cart clear
//! ```

use kubti_cart::{CartSync, RemoteClear};
use kubti_core::{CatalogId, CatalogProduct, EntryKey, NewCartItem, ProductId, Quantity};
use rust_decimal::Decimal;

use crate::error::CliError;
use crate::output;

/// Details of a catalog-fixed product to add on the device.
#[derive(Debug, Clone)]
pub struct LocalProduct {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount_percent: Option<u32>,
    pub size: Option<String>,
    pub note: Option<String>,
}

/// Render the cart.
///
/// # Errors
///
/// Returns `CliError::Json` if JSON output cannot be encoded.
pub async fn show(cart: &CartSync, json: bool) -> Result<String, CliError> {
    let view = cart.view().await;
    let totals = cart.totals().await;
    if json {
        Ok(serde_json::to_string_pretty(&serde_json::json!({
            "entries": view,
            "totals": totals,
        }))?)
    } else {
        Ok(output::cart(&view, &totals))
    }
}

/// Add a backend product.
///
/// # Errors
///
/// Returns `CliError::Cart` if the quantity is invalid or the backend
/// rejects the add.
pub async fn add(
    cart: &CartSync,
    product_id: i64,
    quantity: u32,
    size: Option<String>,
) -> Result<String, CliError> {
    let quantity = Quantity::new(quantity).map_err(kubti_cart::CartError::from)?;
    let entry = cart
        .add(NewCartItem::Server {
            product_id: ProductId::new(product_id),
            quantity,
            selected_size: size,
        })
        .await?;
    Ok(format!(
        "Added {} (now {} in cart)",
        entry.name(),
        entry.quantity()
    ))
}

/// Add a catalog-fixed product to the on-device cart.
///
/// # Errors
///
/// Returns `CliError::Cart` if the quantity is invalid or the item cannot
/// be saved.
pub async fn add_local(
    cart: &CartSync,
    product: LocalProduct,
    quantity: u32,
) -> Result<String, CliError> {
    let quantity = Quantity::new(quantity).map_err(kubti_cart::CartError::from)?;
    let catalog = CatalogProduct {
        id: CatalogId::Fixed(product.id),
        name: product.name,
        price: product.price,
        original_price: product.original_price,
        discount_percent: product.discount_percent,
        image_path: None,
        is_hardcoded: true,
    };
    let item = NewCartItem::from_catalog(&catalog, quantity, product.size, product.note.as_deref());
    let entry = cart.add(item).await?;
    Ok(format!(
        "Added {} (now {} in cart)",
        entry.name(),
        entry.quantity()
    ))
}

/// Set an entry's quantity; below 1 removes it.
///
/// # Errors
///
/// Returns `CliError::Cart` if the entry is unknown or its store rejects
/// the change.
pub async fn set(cart: &CartSync, key: &EntryKey, quantity: i64) -> Result<String, CliError> {
    cart.update_quantity(key, quantity).await?;
    if quantity < 1 {
        Ok(format!("Removed {key}"))
    } else {
        Ok(format!("Set {key} to {quantity}"))
    }
}

/// Remove an entry.
///
/// # Errors
///
/// Returns `CliError::Cart` if the entry is unknown or its store rejects
/// the removal.
pub async fn remove(cart: &CartSync, key: &EntryKey) -> Result<String, CliError> {
    cart.remove(key).await?;
    Ok(format!("Removed {key}"))
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CliError::Cart` if the local cart cannot be written.
pub async fn clear(cart: &CartSync) -> Result<String, CliError> {
    let message = match cart.clear().await? {
        RemoteClear::Failed(reason) => {
            format!("Cart cleared on this device; the store could not be updated: {reason}")
        }
        RemoteClear::Cleared | RemoteClear::Skipped => "Cart cleared".to_string(),
    };
    Ok(message)
}
