//! # bridge-shopify
//!
//! Shopify order backend for checkout-bridge-rs.
//!
//! This crate implements `bridge_core::OrderBackend` over the Shopify
//! Admin REST API:
//!
//! - **Order creation** — paid orders with major-unit amounts, discount
//!   codes, and a `stripe:<payment_reference>` tag for traceability
//! - **Draft-order creation** — abandoned-checkout recovery drafts
//! - **Customer search/create/update** — keeps a durable customer record
//!   with correct marketing consent
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bridge_shopify::ShopifyClient;
//! use bridge_core::OrderBackend;
//!
//! let backend = ShopifyClient::from_env()?;
//! let created = backend.create_order(&order_payload).await?;
//! ```

pub mod client;
pub mod config;
pub mod payload;

// Re-exports
pub use client::ShopifyClient;
pub use config::ShopifyConfig;
pub use payload::{build_draft_order_payload, build_order_payload};
