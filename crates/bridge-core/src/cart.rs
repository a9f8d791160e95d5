//! # Cart Snapshot
//!
//! The immutable cart a storefront hands the bridge for one checkout
//! attempt, plus the minimal metadata snapshot that rides along inside the
//! payment session. The processor does not persist cart semantics, only an
//! opaque metadata string, so the snapshot is what later lets the
//! reconciler rebuild line items with their backend variant identifiers.

use crate::money::Currency;
use serde::{Deserialize, Serialize};

/// Metadata key the serialized cart snapshot is stored under.
pub const CART_ITEMS_METADATA_KEY: &str = "cart_items_json";

/// A single cart line as received from the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Storefront product handle
    pub product_handle: String,

    /// Backend variant identifier (needed to create the downstream order)
    pub variant_id: i64,

    /// Display title
    pub title: String,

    /// Quantity, must be positive
    pub quantity: u32,

    /// Unit price in minor units of the cart currency
    pub unit_price_minor: i64,

    /// Optional image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Line total in minor units
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor * self.quantity as i64
    }
}

/// The cart for one checkout attempt. Created once, immutable once handed
/// to session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Ordered line items
    pub items: Vec<CartItem>,

    /// Checkout currency code as sent by the storefront
    pub currency: String,

    /// Destination country code for shipping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,

    /// Pre-captured customer email, if the storefront knew it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Explicit marketing opt-in captured at cart stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_consent: Option<bool>,

    /// Opaque storefront cart restoration token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_token: Option<String>,
}

impl CartSnapshot {
    /// Cart subtotal in minor units; prices arrive already in the checkout
    /// currency, so this is a plain integer sum with no conversion.
    pub fn subtotal_minor(&self) -> i64 {
        self.items.iter().map(CartItem::line_total_minor).sum()
    }

    /// Resolve the checkout currency; `None` when the code is unknown.
    pub fn resolved_currency(&self) -> Option<Currency> {
        Currency::from_code(&self.currency)
    }

    /// A cart holding only staging/test products ships free.
    pub fn is_test_order(&self) -> bool {
        !self.items.is_empty()
            && self.items.iter().all(|item| {
                item.product_handle.contains("-copy") || item.product_handle.contains("test")
            })
    }

    /// Total item count across lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The minimal per-item reconstruction stored in session metadata.
///
/// Deliberately not the full cart detail: just what order creation needs.
/// The processor's own line-item representation loses `variant_id`, which
/// is why the snapshot exists at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCartItem {
    #[serde(rename = "variantId")]
    pub variant_id: i64,
    pub quantity: u32,
    /// Unit price in minor units of the session currency
    pub price: i64,
}

/// Serialize the cart into the metadata JSON string attached to a session.
pub fn cart_items_to_metadata(items: &[CartItem]) -> String {
    let snapshot: Vec<MetadataCartItem> = items
        .iter()
        .map(|item| MetadataCartItem {
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: item.unit_price_minor,
        })
        .collect();
    serde_json::to_string(&snapshot).unwrap_or_else(|_| "[]".to_string())
}

/// Parse the metadata JSON back into cart items.
///
/// Missing or unparsable metadata yields an empty vec; the reconciler
/// treats that as a business-logic dead end, not an error to retry.
pub fn cart_items_from_metadata(raw: Option<&str>) -> Vec<MetadataCartItem> {
    raw.and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}
