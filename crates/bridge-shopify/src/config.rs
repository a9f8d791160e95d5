//! # Shopify Configuration
//!
//! Configuration for the Shopify Admin API client.
//! Credentials come from environment variables.

use bridge_core::BridgeError;
use std::env;

/// Shopify Admin API configuration
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Store domain, e.g. "example.myshopify.com"
    pub store_domain: String,

    /// Admin API access token (shpat_...)
    pub access_token: String,

    /// Admin API version
    pub api_version: String,

    /// Base URL (for testing/mocking); defaults to https://{store_domain}
    pub base_url: String,
}

impl ShopifyConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SHOPIFY_STORE_DOMAIN`
    /// - `SHOPIFY_ADMIN_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();

        let store_domain = env::var("SHOPIFY_STORE_DOMAIN")
            .map_err(|_| BridgeError::Configuration("SHOPIFY_STORE_DOMAIN not set".to_string()))?;

        let access_token = env::var("SHOPIFY_ADMIN_ACCESS_TOKEN").map_err(|_| {
            BridgeError::Configuration("SHOPIFY_ADMIN_ACCESS_TOKEN not set".to_string())
        })?;

        if store_domain.is_empty() {
            return Err(BridgeError::Configuration(
                "SHOPIFY_STORE_DOMAIN is empty".to_string(),
            ));
        }

        Ok(Self {
            base_url: format!("https://{}", store_domain),
            store_domain,
            access_token,
            api_version: "2024-01".to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(store_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        let store_domain: String = store_domain.into();
        Self {
            base_url: format!("https://{}", store_domain),
            store_domain,
            access_token: access_token.into(),
            api_version: "2024-01".to_string(),
        }
    }

    /// Builder: set custom base URL (for testing)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Full URL for an Admin API resource, e.g. `resource_url("orders.json")`
    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}/admin/api/{}/{}", self.base_url, self.api_version, resource)
    }
}
