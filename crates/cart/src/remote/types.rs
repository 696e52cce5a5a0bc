//! Wire types for the backend REST API.

use kubti_core::{ProductId, Quantity};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/cart`.
#[derive(Debug, Clone, Serialize)]
pub struct AddToCartBody<'a> {
    pub product_id: ProductId,
    pub quantity: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<&'a str>,
}

/// Body of `PUT /api/cart/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityBody {
    pub quantity: Quantity,
}

/// Confirmation returned by delete endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the user-facing message from an error response body.
///
/// Accepts `{"detail": "..."}` and the validation form
/// `{"detail": [{"msg": "..."}, ...]}`. Returns `None` for bodies that are
/// not JSON or carry no usable detail.
#[must_use]
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(errors) => {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
