//! Access to the signed-in user's credentials.
//!
//! The cart never reads a global token. Whoever builds the client hands it a
//! [`SessionProvider`], which is asked for the token on every request so a
//! login or logout takes effect immediately.

use std::sync::Arc;

use async_trait::async_trait;
use kubti_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{KeyValueStore, StoreError, keys};

/// Source of the bearer token for backend requests.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current access token, or `None` when signed out.
    async fn access_token(&self) -> Option<SecretString>;
}

#[async_trait]
impl<T: SessionProvider + ?Sized> SessionProvider for Arc<T> {
    async fn access_token(&self) -> Option<SecretString> {
        (**self).access_token().await
    }
}

/// Profile of the signed-in user as returned at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub points: i64,
}

// =============================================================================
// StoredSession
// =============================================================================

/// Session persisted in the device key-value store under the
/// `access_token` and `user` keys.
#[derive(Clone)]
pub struct StoredSession {
    store: Arc<dyn KeyValueStore>,
}

impl StoredSession {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a token and optionally the profile that came with it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either value cannot be written.
    pub async fn login(
        &self,
        token: &SecretString,
        profile: Option<&UserProfile>,
    ) -> Result<(), StoreError> {
        self.store
            .set(keys::ACCESS_TOKEN, token.expose_secret())
            .await?;
        match profile {
            Some(profile) => {
                let encoded = serde_json::to_string(profile)?;
                self.store.set(keys::USER, &encoded).await?;
            }
            None => self.store.remove(keys::USER).await?,
        }
        info!("Session stored");
        Ok(())
    }

    /// Forget the token and profile. The local cart is left alone.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either key cannot be removed.
    pub async fn logout(&self) -> Result<(), StoreError> {
        self.store.remove(keys::ACCESS_TOKEN).await?;
        self.store.remove(keys::USER).await?;
        info!("Session cleared");
        Ok(())
    }

    /// Stored profile, if any and if it decodes.
    pub async fn profile(&self) -> Option<UserProfile> {
        let raw = match self.store.get(keys::USER).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored profile");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, "Stored profile is corrupt"))
            .ok()
    }
}

#[async_trait]
impl SessionProvider for StoredSession {
    async fn access_token(&self) -> Option<SecretString> {
        match self.store.get(keys::ACCESS_TOKEN).await {
            Ok(Some(token)) if !token.trim().is_empty() => {
                Some(SecretString::from(token.trim().to_string()))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }
}

// =============================================================================
// StaticSession
// =============================================================================

/// Fixed token, for tests and one-off tools.
#[derive(Clone, Default)]
pub struct StaticSession {
    token: Option<SecretString>,
}

impl StaticSession {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
        }
    }

    /// A session with no token.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn access_token(&self) -> Option<SecretString> {
        self.token.clone()
    }
}
