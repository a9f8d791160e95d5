//! # Checkout Bridge
//!
//! Storefront-to-processor checkout bridge.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export SHOPIFY_STORE_DOMAIN=example.myshopify.com
//! export SHOPIFY_ADMIN_ACCESS_TOKEN=shpat_...
//!
//! # Run the server
//! checkout-bridge
//! ```

use bridge_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Success redirect: {}", state.config.success_redirect_url);

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Checkout bridge starting on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/api/v1/checkout/session", addr);
        info!("Webhook:  POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
