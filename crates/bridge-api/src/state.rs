//! # Application State
//!
//! Shared state for the axum application: the payment gateway, the order
//! backend, the immutable shipping table, and the reconciliation engine.
//! Everything is wired once at startup; request handling holds no other
//! state.

use crate::analytics::{AnalyticsClient, AnalyticsConfig};
use crate::reconcile::Reconciler;
use bridge_core::{BoxedOrderBackend, BoxedPaymentGateway, ShippingTable};
use bridge_shopify::ShopifyClient;
use bridge_stripe::StripeGateway;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Where the processor sends the shopper after payment
    pub success_redirect_url: String,
    /// Where the processor sends the shopper on cancel
    pub cancel_redirect_url: String,
    /// Storefront origins allowed by CORS; empty means any
    pub allowed_origins: Vec<String>,
    /// Optional TOML override for the shipping table
    pub shipping_table_path: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            success_redirect_url: std::env::var("SUCCESS_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/checkout/success".to_string()),
            cancel_redirect_url: std::env::var("CANCEL_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/checkout/cancel".to_string()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            shipping_table_path: std::env::var("SHIPPING_TABLE_PATH").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Success URL with the processor's session-id placeholder
    pub fn success_url(&self) -> String {
        if self.success_redirect_url.contains('?') {
            format!(
                "{}&session_id={{CHECKOUT_SESSION_ID}}",
                self.success_redirect_url
            )
        } else {
            format!(
                "{}?session_id={{CHECKOUT_SESSION_ID}}",
                self.success_redirect_url
            )
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment processor gateway
    pub gateway: BoxedPaymentGateway,
    /// Commerce backend
    pub backend: BoxedOrderBackend,
    /// Immutable shipping rate table
    pub shipping: Arc<ShippingTable>,
    /// Event reconciliation engine
    pub reconciler: Arc<Reconciler>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create state from the environment: Stripe gateway, Shopify backend,
    /// shipping table (TOML override or built-in), optional analytics.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let gateway: BoxedPaymentGateway = Arc::new(
            StripeGateway::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?,
        );
        let backend: BoxedOrderBackend = Arc::new(
            ShopifyClient::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to initialize Shopify: {}", e))?,
        );

        let shipping = Arc::new(load_shipping_table(config.shipping_table_path.as_deref())?);
        let analytics = AnalyticsConfig::from_env().map(|c| Arc::new(AnalyticsClient::new(c)));

        Ok(Self::with_components(
            gateway, backend, shipping, analytics, config,
        ))
    }

    /// Wire state from explicit components (tests use this with mocks)
    pub fn with_components(
        gateway: BoxedPaymentGateway,
        backend: BoxedOrderBackend,
        shipping: Arc<ShippingTable>,
        analytics: Option<Arc<AnalyticsClient>>,
        config: AppConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&gateway),
            Arc::clone(&backend),
            analytics,
        ));

        Self {
            gateway,
            backend,
            shipping,
            reconciler,
            config,
        }
    }
}

/// Load the shipping table, preferring a TOML override when configured.
fn load_shipping_table(path: Option<&str>) -> anyhow::Result<ShippingTable> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        let table = ShippingTable::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
        tracing::info!("Loaded shipping table from {}", path);
        return Ok(table);
    }

    tracing::info!("Using built-in shipping table");
    Ok(ShippingTable::builtin())
}
