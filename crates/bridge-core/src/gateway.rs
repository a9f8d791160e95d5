//! # Collaborator Traits
//!
//! The two external collaborators the bridge talks to, behind async trait
//! seams so the reconciliation engine can be exercised against mocks:
//!
//! - [`PaymentGateway`] — the hosted-checkout payment processor
//! - [`OrderBackend`] — the commerce backend that owns durable orders
//!
//! Everything crossing these seams is normalized: the gateway returns a
//! [`SessionDetail`] regardless of the processor's wire shapes, and the
//! backend accepts the domain payloads from [`crate::order`].

use crate::cart::{cart_items_from_metadata, MetadataCartItem, CART_ITEMS_METADATA_KEY};
use crate::error::BridgeResult;
use crate::money::{Currency, REFERENCE_CURRENCY};
use crate::order::{BackendCustomer, BackendOrderRef, CustomerUpsert, DraftOrderPayload, OrderPayload};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Line item name the assembler uses for the shipping charge. The summary
/// endpoint and reconciler filter processor line items on it.
pub const SHIPPING_LINE_NAME: &str = "Shipping";

/// One line of a session-creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Unit amount in minor units of the request currency
    pub unit_amount_minor: i64,
    pub quantity: u32,
}

/// A fully assembled session-creation request, ready for the gateway.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub currency: Currency,
    pub lines: Vec<SessionLine>,
    pub customer_email: Option<String>,
    /// Opaque metadata attached to the session; carries the cart snapshot
    pub metadata: Vec<(String, String)>,
    /// Expiration horizon from creation; the gateway stamps the absolute time
    pub expires_in: Duration,
}

/// Result of creating a hosted checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub checkout_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Postal address as the processor reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// Customer details collected during checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Shipping details collected during checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: Option<Address>,
}

/// A discount extracted from the session's totals breakdown.
///
/// The amount is always in the session's settlement currency and is never
/// re-converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountInfo {
    pub code: String,
    pub amount_minor: i64,
}

/// A line item as the processor reports it on retrieve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: u32,
    /// Line total in minor units
    pub amount_total_minor: i64,
    pub image_url: Option<String>,
}

/// The authoritative, re-fetched state of a checkout session.
///
/// Webhook payloads are treated as triggers only; this is what decisions
/// are made from.
#[derive(Debug, Clone, Default)]
pub struct SessionDetail {
    pub id: String,
    /// Processor payment status, e.g. "paid" / "unpaid"
    pub payment_status: String,
    /// Settlement currency code, uppercase
    pub currency: String,
    pub amount_subtotal_minor: i64,
    pub amount_total_minor: i64,
    pub line_items: Vec<SessionLineItem>,
    pub customer_details: Option<CustomerDetails>,
    pub shipping_details: Option<ShippingDetails>,
    /// Session-level prefill/captured email, distinct from customer details
    pub customer_email: Option<String>,
    /// Processor customer-record reference, when one exists
    pub customer_ref: Option<String>,
    /// Payment reference id (the correlation marker for reconciliation)
    pub payment_reference: Option<String>,
    /// The processor's own generic promotional-consent flag
    pub promotional_consent: Option<bool>,
    pub discount: Option<DiscountInfo>,
    pub metadata: HashMap<String, String>,
}

impl SessionDetail {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Settlement currency, defaulting to the reference currency for
    /// unknown codes.
    pub fn settlement_currency(&self) -> Currency {
        Currency::from_code(&self.currency).unwrap_or(REFERENCE_CURRENCY)
    }

    /// Cart items reconstructed strictly from the stored metadata snapshot.
    /// Empty when the snapshot is missing or unparsable.
    pub fn metadata_cart_items(&self) -> Vec<MetadataCartItem> {
        cart_items_from_metadata(self.metadata.get(CART_ITEMS_METADATA_KEY).map(String::as_str))
    }

    /// Shipping address, preferring shipping details over the customer's
    /// billing address.
    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_details
            .as_ref()
            .and_then(|s| s.address.as_ref())
            .or_else(|| {
                self.customer_details
                    .as_ref()
                    .and_then(|c| c.address.as_ref())
            })
    }

    /// Line total of the shipping charge, if the session carries one.
    pub fn shipping_line_total_minor(&self) -> i64 {
        self.line_items
            .iter()
            .find(|item| item.name == SHIPPING_LINE_NAME)
            .map(|item| item.amount_total_minor)
            .unwrap_or(0)
    }

    /// Effective marketing consent.
    ///
    /// An explicit cart-stage consent stashed in metadata reflects a more
    /// specific, user-facing opt-in and takes priority over the processor's
    /// generic promotional flag.
    pub fn marketing_consent(&self) -> bool {
        match self.metadata.get("marketing_consent").map(String::as_str) {
            Some("true") => true,
            Some("false") => false,
            _ => self.promotional_consent.unwrap_or(false),
        }
    }
}

/// A persistent customer record at the processor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Payment lifecycle event kinds the bridge acts on. Everything else is
/// acknowledged without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEventKind {
    SessionCompleted,
    SessionExpired,
    Other(String),
}

/// A verified, parsed lifecycle event
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub id: String,
    pub kind: LifecycleEventKind,
    /// Correlation key back to the checkout session
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The hosted-checkout payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session; returns the redirect handle.
    async fn create_session(
        &self,
        request: &SessionRequest,
        success_url: &str,
        cancel_url: &str,
    ) -> BridgeResult<CreatedSession>;

    /// Re-fetch the authoritative session state by id.
    async fn retrieve_session(&self, session_id: &str) -> BridgeResult<SessionDetail>;

    /// Fetch a persistent customer record by reference.
    async fn retrieve_customer(&self, customer_ref: &str) -> BridgeResult<CustomerRecord>;

    /// Verify a delivered event's signature and parse it. Must reject
    /// before any side effect when the signature does not match.
    fn verify_event(&self, payload: &[u8], signature: &str) -> BridgeResult<LifecycleEvent>;
}

/// The commerce backend that owns durable orders and customers.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn create_order(&self, order: &OrderPayload) -> BridgeResult<BackendOrderRef>;

    async fn create_draft_order(&self, draft: &DraftOrderPayload) -> BridgeResult<BackendOrderRef>;

    async fn find_customer_by_email(&self, email: &str) -> BridgeResult<Option<BackendCustomer>>;

    async fn create_customer(&self, customer: &CustomerUpsert) -> BridgeResult<BackendCustomer>;

    async fn update_customer(
        &self,
        customer_id: i64,
        customer: &CustomerUpsert,
    ) -> BridgeResult<BackendCustomer>;
}

/// Type aliases for shared trait objects
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
pub type BoxedOrderBackend = Arc<dyn OrderBackend>;
