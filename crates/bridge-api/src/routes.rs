//! # Routes
//!
//! Axum router configuration for the checkout bridge.

use crate::handlers;
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - POST /api/v1/checkout/session - Create a checkout session
/// - GET  /api/v1/checkout/session/{session_id} - Order summary
/// - POST /webhook/stripe - Payment lifecycle events
pub fn create_router(state: AppState) -> Router {
    // Storefront origins from config; open when none are configured
    let cors = if state.config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/checkout/session", post(handlers::create_checkout_session))
        .route("/checkout/session/{session_id}", get(handlers::get_session));

    // Webhook routes bypass CORS and must receive the raw body untouched
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
