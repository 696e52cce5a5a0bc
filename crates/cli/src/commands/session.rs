//! Sign-in state commands.
//!
//! # Usage
//!
//! ```bash
//! kubti login --token eyJhbGciOi...
//! kubti logout
//! ```

use kubti_cart::SessionProvider;
use secrecy::SecretString;

use super::Context;
use crate::error::CliError;

/// Store an access token.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for a blank token, or
/// `CliError::Store` if it cannot be saved.
pub async fn login(ctx: &Context, token: &str) -> Result<String, CliError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::InvalidArgument("token must not be empty".to_string()));
    }
    ctx.session
        .login(&SecretString::from(token.to_string()), None)
        .await?;
    tracing::info!("Access token stored");
    Ok("Signed in".to_string())
}

/// Forget the access token. Local cart items stay on the device.
///
/// # Errors
///
/// Returns `CliError::Store` if the token cannot be removed.
pub async fn logout(ctx: &Context) -> Result<String, CliError> {
    ctx.session.logout().await?;
    Ok("Signed out".to_string())
}

/// Describe the current session.
pub async fn status(ctx: &Context) -> String {
    match (ctx.session.access_token().await, ctx.session.profile().await) {
        (Some(_), Some(profile)) => format!("Signed in as {}", profile.email),
        (Some(_), None) => "Signed in".to_string(),
        (None, _) => "Not signed in".to_string(),
    }
}
