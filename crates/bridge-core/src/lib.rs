//! # bridge-core
//!
//! Core types and logic for the checkout-bridge engine.
//!
//! This crate provides:
//! - `Money` and `Currency` for integer minor-unit arithmetic
//! - `ShippingTable` for zone-based, multi-currency shipping pricing
//! - `CartSnapshot` and the session metadata snapshot
//! - `assemble_session_request` for building payment-session requests
//! - `PaymentGateway` / `OrderBackend` traits for the external collaborators
//! - `OrderPayload` / `DraftOrderPayload` for the commerce backend
//! - `BridgeError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_core::{assemble_session_request, CartSnapshot, ShippingTable};
//!
//! let shipping = ShippingTable::builtin();
//! let request = assemble_session_request(&cart, &shipping)?;
//! let session = gateway.create_session(&request, &success_url, &cancel_url).await?;
//!
//! // Redirect the shopper to session.checkout_url
//! ```

pub mod assemble;
pub mod cart;
pub mod error;
pub mod gateway;
pub mod money;
pub mod order;
pub mod shipping;

// Re-exports for convenience
pub use assemble::{assemble_session_request, DEFAULT_DESTINATION_COUNTRY, SESSION_EXPIRY_MINUTES};
pub use cart::{
    cart_items_from_metadata, cart_items_to_metadata, CartItem, CartSnapshot, MetadataCartItem,
    CART_ITEMS_METADATA_KEY,
};
pub use error::{BridgeError, BridgeResult};
pub use gateway::{
    Address, BoxedOrderBackend, BoxedPaymentGateway, CreatedSession, CustomerDetails,
    CustomerRecord, DiscountInfo, LifecycleEvent, LifecycleEventKind, OrderBackend,
    PaymentGateway, SessionDetail, SessionLine, SessionLineItem, SessionRequest, ShippingDetails,
    SHIPPING_LINE_NAME,
};
pub use money::{
    convert_minor, major_units_string, Currency, Money, REFERENCE_CURRENCY,
};
pub use order::{
    split_name, BackendCustomer, BackendOrderRef, CustomerUpsert, DraftOrderPayload, OrderPayload,
};
pub use shipping::{ShippingRule, ShippingTable};
