//! # bridge-api
//!
//! HTTP API layer for checkout-bridge-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for session creation and order summaries
//! - The webhook endpoint and the event reconciliation engine
//! - Fire-and-forget conversion tracking
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/checkout/session` | Create checkout session |
//! | GET | `/api/v1/checkout/session/{id}` | Order summary |
//! | POST | `/webhook/stripe` | Payment lifecycle events |

pub mod analytics;
pub mod handlers;
pub mod reconcile;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use reconcile::{ReconciliationOutcome, Reconciler, SkipReason};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
