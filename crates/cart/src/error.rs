//! Unified error handling with Sentry integration.
//!
//! Every public cart operation returns `Result<T, CartError>`. Use
//! [`CartError::user_message`] for text shown to the shopper.

use kubti_core::{CartEntryError, EntryKey};
use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Error type for cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Backend call failed.
    #[error("Remote cart error: {0}")]
    Remote(#[from] RemoteError),

    /// On-device storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A value such as a quantity was out of range.
    #[error("Invalid cart value: {0}")]
    Entry(#[from] CartEntryError),

    /// The addressed entry is not in the cart view.
    #[error("Not in cart: {0}")]
    NotInCart(EntryKey),

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,
}

impl CartError {
    /// Message suitable for showing to the shopper.
    ///
    /// Backend `detail` messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(RemoteError::Api { detail, .. } | RemoteError::Unauthorized(detail)) => {
                detail.clone()
            }
            Self::Remote(RemoteError::NotAuthenticated) => "Not authenticated".to_string(),
            Self::Remote(RemoteError::Http(_)) => {
                "Could not reach the store. Check your connection and try again.".to_string()
            }
            Self::Remote(RemoteError::Parse(_) | RemoteError::Url(_)) => {
                "Unexpected response from the store".to_string()
            }
            Self::Storage(_) => "Could not save your cart on this device".to_string(),
            Self::Entry(err) => err.to_string(),
            Self::NotInCart(_) => "This item is no longer in your cart".to_string(),
            Self::EmptyCart => "Please add items to your cart first".to_string(),
        }
    }

    /// Whether the failure was the backend rejecting the session.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_auth())
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
