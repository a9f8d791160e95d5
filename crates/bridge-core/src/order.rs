//! # Backend Order Payloads
//!
//! Backend-agnostic descriptions of the order and draft order the
//! reconciler wants created, derived from an authoritative session. The
//! commerce-backend crate turns these into its own wire shapes (major-unit
//! strings, tags, note attributes).

use crate::cart::MetadataCartItem;
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::{Address, DiscountInfo, SessionDetail};

/// A finalized, paid order to create in the backend
#[derive(Debug, Clone)]
pub struct OrderPayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub items: Vec<MetadataCartItem>,
    pub shipping_address: Address,
    /// Settlement currency code, uppercase
    pub currency: String,
    pub total_minor: i64,
    pub shipping_minor: i64,
    /// Processor payment reference, the correlation marker for manual
    /// reconciliation
    pub payment_reference: String,
    pub discount: Option<DiscountInfo>,
    pub accepts_marketing: bool,
}

impl OrderPayload {
    /// Build from a completed session.
    ///
    /// Fails with `MissingData` when no shipping address is resolvable;
    /// cart items are the caller's responsibility (the reconciler has
    /// already rejected empty snapshots by the time this runs).
    pub fn from_session(
        session: &SessionDetail,
        items: Vec<MetadataCartItem>,
        discount: Option<DiscountInfo>,
    ) -> BridgeResult<Self> {
        let address = session
            .shipping_address()
            .cloned()
            .ok_or_else(|| BridgeError::MissingData("no shipping address on session".into()))?;

        let customer = session.customer_details.as_ref();
        let (first_name, last_name) = split_name(customer.and_then(|c| c.name.as_deref()));

        Ok(Self {
            email: customer
                .and_then(|c| c.email.clone())
                .unwrap_or_default(),
            first_name,
            last_name,
            phone: customer.and_then(|c| c.phone.clone()),
            items,
            shipping_address: address,
            currency: session
                .metadata
                .get("currency")
                .cloned()
                .unwrap_or_else(|| session.currency.clone()),
            total_minor: session.amount_total_minor,
            shipping_minor: session.shipping_line_total_minor(),
            payment_reference: session
                .payment_reference
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            discount,
            accepts_marketing: session.marketing_consent(),
        })
    }
}

/// An unpaid recovery draft for an abandoned session
#[derive(Debug, Clone)]
pub struct DraftOrderPayload {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub items: Vec<MetadataCartItem>,
    /// Best effort; a draft without an address is still worth creating
    pub shipping_address: Option<Address>,
    /// Session id, carried in the draft note for traceability
    pub session_id: String,
    pub discount: Option<DiscountInfo>,
    /// Settlement currency of the discount amount
    pub currency: String,
    pub accepts_marketing: bool,
}

impl DraftOrderPayload {
    /// Build from an expired session and a discovered contact email.
    pub fn from_session(
        session: &SessionDetail,
        items: Vec<MetadataCartItem>,
        email: String,
        discount: Option<DiscountInfo>,
    ) -> Self {
        let customer = session.customer_details.as_ref();
        let name = customer.and_then(|c| c.name.as_deref());
        let (first_name, last_name) = match name {
            Some(name) => {
                let (first, last) = split_name(Some(name));
                (Some(first), Some(last))
            }
            None => (None, None),
        };

        Self {
            email,
            first_name,
            last_name,
            phone: customer.and_then(|c| c.phone.clone()),
            items,
            shipping_address: session.shipping_address().cloned(),
            session_id: session.id.clone(),
            discount,
            currency: session
                .metadata
                .get("currency")
                .cloned()
                .unwrap_or_else(|| session.currency.clone()),
            accepts_marketing: session.marketing_consent(),
        }
    }
}

/// Customer create/update request for the backend
#[derive(Debug, Clone)]
pub struct CustomerUpsert {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub accepts_marketing: bool,
    pub tags: String,
}

/// A customer record as the backend reports it
#[derive(Debug, Clone)]
pub struct BackendCustomer {
    pub id: i64,
    pub email: String,
}

/// Reference to a created order or draft order
#[derive(Debug, Clone, Default)]
pub struct BackendOrderRef {
    pub id: Option<i64>,
    pub order_number: Option<i64>,
}

/// Split a display name into (first, last); first token and remainder,
/// with a placeholder when nothing was collected.
pub fn split_name(name: Option<&str>) -> (String, String) {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let mut parts = name.split_whitespace();
            let first = parts.next().unwrap_or("Customer").to_string();
            let last = parts.collect::<Vec<_>>().join(" ");
            (first, last)
        }
        None => ("Customer".to_string(), String::new()),
    }
}
