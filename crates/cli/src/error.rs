//! CLI error type.

use kubti_cart::config::ConfigError;
use kubti_cart::store::StoreError;
use kubti_cart::{CartError, RemoteError};
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// On-device storage failed outside a cart operation.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The backend client could not be built.
    #[error("Backend error: {0}")]
    Remote(#[from] RemoteError),

    /// Output could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A command-line value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Message to show on failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
