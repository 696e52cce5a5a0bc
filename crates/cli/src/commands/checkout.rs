//! Checkout command.
//!
//! # Usage
//!
//! ```bash
//! kubti checkout --address "12 Lake Road" --city Pune --state Maharashtra \
//!     --pincode 411001 --phone 9876543210
//! ```

use kubti_cart::CartSync;
use kubti_core::DeliveryAddress;

use crate::error::CliError;
use crate::output;

/// Place an order for the whole cart.
///
/// # Errors
///
/// Returns `CliError::Cart` if the cart is empty or the order is rejected.
pub async fn place_order(cart: &CartSync, address: DeliveryAddress) -> Result<String, CliError> {
    let order = cart.place_order(address).await?;
    Ok(output::order(&order))
}
