//! Cart entry types.
//!
//! A cart is the concatenation of two lists with different owners:
//!
//! - **Server-backed items** live in the backend cart and are addressed by a
//!   server-assigned [`CartItemId`]. They embed the full [`ProductRef`].
//! - **Local-only items** live in on-device storage and are addressed by a
//!   [`LocalItemId`] (a catalog-fixed slug such as `allwood-1`, or a generated
//!   UUID). They carry the product fields inline.
//!
//! Provenance is decided once, when the entry is created, and carried by the
//! [`CartEntry`] variant. Mutations dispatch on the variant and never re-infer
//! ownership from field presence.

use core::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CartItemId, ProductId};
use super::price::apply_discount;

/// Errors that can occur when constructing cart values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartEntryError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// Quantity does not fit the supported range.
    #[error("quantity {0} is out of range")]
    OutOfRange(i64),
    /// Local item IDs cannot be blank.
    #[error("local item id cannot be empty")]
    EmptyLocalId,
}

// =============================================================================
// Quantity
// =============================================================================

/// A cart line quantity. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns `CartEntryError::ZeroQuantity` if `value` is zero.
    pub const fn new(value: u32) -> Result<Self, CartEntryError> {
        match NonZeroU32::new(value) {
            Some(q) => Ok(Self(q)),
            None => Err(CartEntryError::ZeroQuantity),
        }
    }

    /// Interpret a user-requested quantity.
    ///
    /// Returns `None` for anything below one, which callers treat as
    /// "remove the line".
    ///
    /// # Errors
    ///
    /// Returns `CartEntryError::OutOfRange` if the request exceeds `u32::MAX`.
    pub fn from_requested(requested: i64) -> Result<Option<Self>, CartEntryError> {
        if requested < 1 {
            return Ok(None);
        }
        let value = u32::try_from(requested).map_err(|_| CartEntryError::OutOfRange(requested))?;
        Self::new(value).map(Some)
    }

    /// The underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl TryFrom<u32> for Quantity {
    type Error = CartEntryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product details embedded in a server cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Backend product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current selling price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price before markdown, when the product is on sale.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    /// Whole-number discount percentage.
    #[serde(default)]
    pub discount_percent: Option<u32>,
    /// Image path, either absolute URL or relative to the API base.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Pack size (e.g. `4L`).
    #[serde(default)]
    pub size: Option<String>,
    /// Units in stock.
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Identifier of a catalog product, as shown in product listings.
///
/// Numeric IDs come from the backend catalog. String IDs are catalog-fixed
/// entries that have not been migrated to the backend yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    /// Backend product.
    Numeric(ProductId),
    /// Catalog-fixed product known only to the client.
    Fixed(String),
}

/// Where a cart entry's source of truth lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The backend cart service.
    Server,
    /// On-device storage.
    Local,
}

/// A product as presented by the catalog, before it is added to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: CatalogId,
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<u32>,
    #[serde(default, alias = "image_url")]
    pub image_path: Option<String>,
    /// Explicit marker for catalog entries that must stay on-device.
    #[serde(default, rename = "isHardcoded")]
    pub is_hardcoded: bool,
}

impl CatalogProduct {
    /// Decide which store owns carts lines for this product.
    ///
    /// Only numeric IDs without the hardcoded marker are server-backed.
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self.id {
            CatalogId::Numeric(_) if !self.is_hardcoded => Provenance::Server,
            _ => Provenance::Local,
        }
    }
}

// =============================================================================
// Cart Items
// =============================================================================

/// A cart item owned by the backend cart service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCartItem {
    /// Server-assigned cart item ID.
    pub id: CartItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    pub product: ProductRef,
    /// Server-computed line subtotal. Informational only; totals are
    /// always folded from the current view.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtotal: Option<Decimal>,
}

/// Identifier of a local-only cart item.
///
/// Older app versions stored some catalog IDs as JSON numbers, so both
/// strings and numbers are accepted when decoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocalItemId(String);

impl LocalItemId {
    /// Create a local item ID.
    ///
    /// # Errors
    ///
    /// Returns `CartEntryError::EmptyLocalId` if the ID is blank.
    pub fn parse(id: impl Into<String>) -> Result<Self, CartEntryError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CartEntryError::EmptyLocalId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh random ID for products without a catalog ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("local-{}", uuid::Uuid::new_v4()))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The backend product behind a numeric catalog ID, if this is one.
    #[must_use]
    pub fn catalog_product_id(&self) -> Option<ProductId> {
        self.0.parse().ok()
    }
}

impl fmt::Display for LocalItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LocalItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        Self::parse(id).map_err(serde::de::Error::custom)
    }
}

/// A cart item persisted only on this device.
///
/// Field names match the on-device JSON layout written by earlier app
/// versions (`selectedSize`, `customRequest`, `isHardcoded`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCartItem {
    pub id: LocalItemId,
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub quantity: Quantity,
    #[serde(
        default,
        rename = "selectedSize",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_size: Option<String>,
    #[serde(
        default,
        rename = "customRequest",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_request: Option<String>,
    #[serde(
        default,
        rename = "isHardcoded",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_hardcoded: bool,
}

impl LocalCartItem {
    /// Fold another add of the same product into this line.
    ///
    /// Quantities add up. A size or note on the incoming add replaces the
    /// stored one; absent values leave it unchanged.
    pub fn merge(&mut self, incoming: &Self) {
        self.quantity = self.quantity.saturating_add(incoming.quantity);
        if let Some(size) = &incoming.selected_size {
            self.selected_size = Some(size.clone());
        }
        if let Some(note) = &incoming.custom_request {
            self.custom_request = Some(note.clone());
        }
    }
}

// =============================================================================
// Unified Entries
// =============================================================================

/// Key addressing one entry of the unified cart view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum EntryKey {
    Server(CartItemId),
    Local(LocalItemId),
}

impl EntryKey {
    /// Which store owns the entry.
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Server(_) => Provenance::Server,
            Self::Local(_) => Provenance::Local,
        }
    }
}

/// Prefix that marks a local entry key in text form.
///
/// Local IDs may be numeric, so a bare integer alone cannot say which
/// store owns an entry.
pub const LOCAL_KEY_PREFIX: &str = "local:";

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "{id}"),
            Self::Local(id) => write!(f, "{LOCAL_KEY_PREFIX}{id}"),
        }
    }
}

/// Inverse of `Display`.
///
/// `local:<id>` is always a local entry and a bare integer is always a
/// server cart item. Other bare text is taken as a local ID.
impl FromStr for EntryKey {
    type Err = CartEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(local) = s.strip_prefix(LOCAL_KEY_PREFIX) {
            return LocalItemId::parse(local).map(Self::Local);
        }
        s.parse::<CartItemId>().map_or_else(
            |_| LocalItemId::parse(s).map(Self::Local),
            |id| Ok(Self::Server(id)),
        )
    }
}

/// One entry of the unified cart view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CartEntry {
    Server(ServerCartItem),
    Local(LocalCartItem),
}

impl CartEntry {
    /// The key addressing this entry.
    #[must_use]
    pub fn key(&self) -> EntryKey {
        match self {
            Self::Server(item) => EntryKey::Server(item.id),
            Self::Local(item) => EntryKey::Local(item.id.clone()),
        }
    }

    /// Which store owns the entry.
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Server(_) => Provenance::Server,
            Self::Local(_) => Provenance::Local,
        }
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        match self {
            Self::Server(item) => item.quantity,
            Self::Local(item) => item.quantity,
        }
    }

    /// A copy of this entry with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: Quantity) -> Self {
        let mut entry = self.clone();
        match &mut entry {
            Self::Server(item) => item.quantity = quantity,
            Self::Local(item) => item.quantity = quantity,
        }
        entry
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Server(item) => &item.product.name,
            Self::Local(item) => &item.name,
        }
    }

    /// Listed unit price, before any percentage discount.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        match self {
            Self::Server(item) => item.product.price,
            Self::Local(item) => item.price,
        }
    }

    #[must_use]
    pub const fn original_price(&self) -> Option<Decimal> {
        match self {
            Self::Server(item) => item.product.original_price,
            Self::Local(item) => item.original_price,
        }
    }

    #[must_use]
    pub const fn discount_percent(&self) -> Option<u32> {
        match self {
            Self::Server(item) => item.product.discount_percent,
            Self::Local(item) => item.discount_percent,
        }
    }

    #[must_use]
    pub fn selected_size(&self) -> Option<&str> {
        match self {
            Self::Server(item) => item.selected_size.as_deref(),
            Self::Local(item) => item.selected_size.as_deref(),
        }
    }

    /// Unit price with the discount percentage applied, if any.
    #[must_use]
    pub fn effective_unit_price(&self) -> Decimal {
        self.discount_percent()
            .map_or_else(|| self.price(), |p| apply_discount(self.price(), p))
    }

    /// Effective unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.effective_unit_price() * Decimal::from(self.quantity().get())
    }
}

// =============================================================================
// Add-to-cart Requests
// =============================================================================

/// An add-to-cart request, with its target store already decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewCartItem {
    /// Add through the backend cart service.
    Server {
        product_id: ProductId,
        quantity: Quantity,
        selected_size: Option<String>,
    },
    /// Add to on-device storage.
    Local(LocalCartItem),
}

impl NewCartItem {
    /// Build an add request from a catalog product.
    ///
    /// The custom request note is trimmed; a blank note is dropped.
    #[must_use]
    pub fn from_catalog(
        product: &CatalogProduct,
        quantity: Quantity,
        selected_size: Option<String>,
        custom_request: Option<&str>,
    ) -> Self {
        match (&product.id, product.provenance()) {
            (CatalogId::Numeric(product_id), Provenance::Server) => Self::Server {
                product_id: *product_id,
                quantity,
                selected_size,
            },
            (id, _) => {
                let local_id = match id {
                    CatalogId::Numeric(n) => LocalItemId(n.to_string()),
                    CatalogId::Fixed(s) => {
                        LocalItemId::parse(s.clone()).unwrap_or_else(|_| LocalItemId::generate())
                    }
                };
                Self::Local(LocalCartItem {
                    id: local_id,
                    name: product.name.clone(),
                    price: product.price,
                    original_price: product.original_price,
                    discount_percent: product.discount_percent,
                    image_path: product.image_path.clone(),
                    quantity,
                    selected_size,
                    custom_request: custom_request
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                    is_hardcoded: product.is_hardcoded || matches!(id, CatalogId::Fixed(_)),
                })
            }
        }
    }

    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Server { .. } => Provenance::Server,
            Self::Local(_) => Provenance::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(id: CatalogId) -> CatalogProduct {
        CatalogProduct {
            id,
            name: "Allwood Teak".to_string(),
            price: Decimal::from(450),
            original_price: None,
            discount_percent: None,
            image_path: None,
            is_hardcoded: false,
        }
    }

    #[test]
    fn test_quantity_rejects_zero() {
        assert_eq!(Quantity::new(0), Err(CartEntryError::ZeroQuantity));
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_quantity_from_requested() {
        assert_eq!(Quantity::from_requested(0).unwrap(), None);
        assert_eq!(Quantity::from_requested(-4).unwrap(), None);
        assert_eq!(Quantity::from_requested(2).unwrap(), Some(Quantity::new(2).unwrap()));
        assert!(Quantity::from_requested(i64::MAX).is_err());
    }

    #[test]
    fn test_server_item_decodes_backend_shape() {
        let json = r#"{
            "id": 12,
            "product_id": 3,
            "quantity": 2,
            "selected_size": "4L",
            "product": {
                "id": 3,
                "name": "Birla Opus One",
                "price": 100.0,
                "original_price": 120.0,
                "discount_percent": 16,
                "image_path": "/static/one.png",
                "stock": 40,
                "category_id": 1,
                "is_active": true
            },
            "subtotal": 200.0
        }"#;
        let item: ServerCartItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, CartItemId::new(12));
        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.product.price, Decimal::from(100));
        assert_eq!(item.product.original_price, Some(Decimal::from(120)));
        assert_eq!(item.subtotal, Some(Decimal::from(200)));
    }

    #[test]
    fn test_local_item_decodes_device_shape() {
        let json = r#"{
            "id": "allwood-1",
            "name": "Allwood Teak",
            "price": 450,
            "image_url": "https://cdn.example/teak.png",
            "quantity": 1,
            "selectedSize": "1L",
            "customRequest": "matte finish",
            "isHardcoded": true
        }"#;
        let item: LocalCartItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "allwood-1");
        assert_eq!(item.selected_size.as_deref(), Some("1L"));
        assert_eq!(item.custom_request.as_deref(), Some("matte finish"));
        assert_eq!(item.image_path.as_deref(), Some("https://cdn.example/teak.png"));
        assert!(item.is_hardcoded);

        let encoded = serde_json::to_value(&item).unwrap();
        assert_eq!(encoded["selectedSize"], "1L");
        assert_eq!(encoded["customRequest"], "matte finish");
    }

    #[test]
    fn test_local_item_id_accepts_numbers() {
        let id: LocalItemId = serde_json::from_str("17").unwrap();
        assert_eq!(id.as_str(), "17");
        assert!(serde_json::from_str::<LocalItemId>("\"  \"").is_err());
    }

    #[test]
    fn test_catalog_provenance() {
        assert_eq!(
            catalog(CatalogId::Numeric(ProductId::new(3))).provenance(),
            Provenance::Server
        );
        assert_eq!(
            catalog(CatalogId::Fixed("allwood-1".to_string())).provenance(),
            Provenance::Local
        );

        let mut flagged = catalog(CatalogId::Numeric(ProductId::new(3)));
        flagged.is_hardcoded = true;
        assert_eq!(flagged.provenance(), Provenance::Local);
    }

    #[test]
    fn test_new_cart_item_from_catalog_trims_note() {
        let product = catalog(CatalogId::Fixed("allwood-1".to_string()));
        let item = NewCartItem::from_catalog(&product, Quantity::ONE, None, Some("   "));
        let NewCartItem::Local(local) = item else {
            panic!("expected local item");
        };
        assert_eq!(local.custom_request, None);
        assert!(local.is_hardcoded);

        let item = NewCartItem::from_catalog(&product, Quantity::ONE, None, Some(" gloss "));
        let NewCartItem::Local(local) = item else {
            panic!("expected local item");
        };
        assert_eq!(local.custom_request.as_deref(), Some("gloss"));
    }

    #[test]
    fn test_local_merge() {
        let product = catalog(CatalogId::Fixed("allwood-1".to_string()));
        let NewCartItem::Local(mut stored) =
            NewCartItem::from_catalog(&product, Quantity::ONE, Some("1L".to_string()), Some("a"))
        else {
            panic!("expected local item");
        };
        let NewCartItem::Local(incoming) =
            NewCartItem::from_catalog(&product, Quantity::new(2).unwrap(), None, None)
        else {
            panic!("expected local item");
        };

        stored.merge(&incoming);
        assert_eq!(stored.quantity.get(), 3);
        assert_eq!(stored.selected_size.as_deref(), Some("1L"));
        assert_eq!(stored.custom_request.as_deref(), Some("a"));
    }

    #[test]
    fn test_entry_key_parse() {
        assert_eq!(
            "12".parse::<EntryKey>().unwrap(),
            EntryKey::Server(CartItemId::new(12))
        );
        assert_eq!(
            "allwood-1".parse::<EntryKey>().unwrap(),
            EntryKey::Local(LocalItemId::parse("allwood-1").unwrap())
        );
        assert_eq!(
            "local:allwood-1".parse::<EntryKey>().unwrap(),
            EntryKey::Local(LocalItemId::parse("allwood-1").unwrap())
        );
        assert!("".parse::<EntryKey>().is_err());
        assert!("local:".parse::<EntryKey>().is_err());
    }

    #[test]
    fn test_numeric_local_key_round_trips() {
        let product = catalog(CatalogId::Numeric(ProductId::new(17)));
        let product = CatalogProduct {
            is_hardcoded: true,
            ..product
        };
        let NewCartItem::Local(item) = NewCartItem::from_catalog(&product, Quantity::ONE, None, None)
        else {
            panic!("expected a local add");
        };
        let key = CartEntry::Local(item).key();

        assert_eq!(key.to_string(), "local:17");
        assert_eq!(key.to_string().parse::<EntryKey>().unwrap(), key);
        assert_eq!(
            "17".parse::<EntryKey>().unwrap(),
            EntryKey::Server(CartItemId::new(17))
        );
    }
}
