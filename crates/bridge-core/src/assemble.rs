//! # Checkout Session Assembler
//!
//! Turns a validated [`CartSnapshot`] into the [`SessionRequest`] handed to
//! the payment gateway: storefront line items, a shipping line when the
//! engine prices one, and the metadata snapshot the reconciler will need
//! long after the storefront cart is gone.

use crate::cart::{cart_items_to_metadata, CartSnapshot, CART_ITEMS_METADATA_KEY};
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::{SessionLine, SessionRequest, SHIPPING_LINE_NAME};
use crate::shipping::ShippingTable;
use chrono::Duration;

/// Destination used when the storefront did not send a country.
pub const DEFAULT_DESTINATION_COUNTRY: &str = "US";

/// Fixed expiration horizon so abandoned sessions surface within a bounded
/// window (the processor's minimum).
pub const SESSION_EXPIRY_MINUTES: i64 = 30;

/// Assemble a session-creation request from a cart.
///
/// Validates the cart, prices shipping, and serializes the minimal cart
/// reconstruction into session metadata.
pub fn assemble_session_request(
    cart: &CartSnapshot,
    shipping: &ShippingTable,
) -> BridgeResult<SessionRequest> {
    if cart.is_empty() {
        return Err(BridgeError::InvalidCart("cart has no items".to_string()));
    }

    let currency = cart.resolved_currency().ok_or_else(|| {
        BridgeError::UnsupportedCurrency {
            currency: cart.currency.clone(),
        }
    })?;

    for item in &cart.items {
        if item.quantity == 0 {
            return Err(BridgeError::InvalidCart(format!(
                "item {} has zero quantity",
                item.product_handle
            )));
        }
        if item.unit_price_minor < 0 {
            return Err(BridgeError::InvalidCart(format!(
                "item {} has negative price",
                item.product_handle
            )));
        }
    }

    let subtotal = cart.subtotal_minor();
    let country = cart
        .destination_country
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_DESTINATION_COUNTRY);

    let shipping_cost = if cart.is_test_order() {
        0
    } else {
        shipping.calculate(country, &cart.currency, subtotal)
    };

    let mut lines: Vec<SessionLine> = cart
        .items
        .iter()
        .map(|item| SessionLine {
            name: item.title.clone(),
            description: None,
            image_url: item.image_url.clone(),
            unit_amount_minor: item.unit_price_minor,
            quantity: item.quantity,
        })
        .collect();

    if shipping_cost > 0 {
        lines.push(SessionLine {
            name: SHIPPING_LINE_NAME.to_string(),
            description: Some("International shipping".to_string()),
            image_url: None,
            unit_amount_minor: shipping_cost,
            quantity: 1,
        });
    }

    let mut metadata = vec![
        (
            CART_ITEMS_METADATA_KEY.to_string(),
            cart_items_to_metadata(&cart.items),
        ),
        ("currency".to_string(), currency.code()),
        ("country_code".to_string(), country.to_string()),
        (
            "customer_email".to_string(),
            cart.customer_email.clone().unwrap_or_default(),
        ),
        (
            "shopify_cart_token".to_string(),
            cart.cart_token.clone().unwrap_or_default(),
        ),
    ];

    // Only an explicitly captured opt-in is recorded; its presence is what
    // gives it precedence over the processor's own consent flag later.
    if let Some(consent) = cart.marketing_consent {
        metadata.push(("marketing_consent".to_string(), consent.to_string()));
    }

    Ok(SessionRequest {
        currency,
        lines,
        customer_email: cart
            .customer_email
            .clone()
            .filter(|email| !email.is_empty()),
        metadata,
        expires_in: Duration::minutes(SESSION_EXPIRY_MINUTES),
    })
}
