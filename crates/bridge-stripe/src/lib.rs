//! # bridge-stripe
//!
//! Stripe gateway for checkout-bridge-rs, built on the Checkout Sessions
//! API.
//!
//! This crate implements `bridge_core::PaymentGateway`:
//!
//! - **Session creation** — hosted checkout with dynamic line items,
//!   bounded expiry, phone collection, and the store's delivery countries
//! - **Session retrieval** — re-fetches the authoritative session with line
//!   items, customer details, payment reference, and discount breakdown
//!   expanded, normalized into `SessionDetail`
//! - **Webhook verification** — Stripe-Signature HMAC check with timestamp
//!   tolerance, then envelope parsing into `LifecycleEvent`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bridge_stripe::StripeGateway;
//! use bridge_core::PaymentGateway;
//!
//! let gateway = StripeGateway::from_env()?;
//! let created = gateway.create_session(&request, &success_url, &cancel_url).await?;
//!
//! // Redirect the shopper to created.checkout_url
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::{StripeGateway, ALLOWED_SHIPPING_COUNTRIES};
pub use config::StripeConfig;
pub use webhook::verify_and_parse;
