//! # Conversion Tracking
//!
//! GA4 Measurement Protocol purchase pings, dispatched as detached tasks.
//! A ping never blocks or fails the flow that triggered it; the completion
//! is logged and dropped. When credentials are absent the client is simply
//! not constructed and the whole concern disappears.

use bridge_core::SessionDetail;
use tracing::{debug, error, info};

const MEASUREMENT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";

/// GA4 Measurement Protocol credentials
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub measurement_id: String,
    pub api_secret: String,
    pub endpoint: String,
}

impl AnalyticsConfig {
    /// Load from `GA_MEASUREMENT_ID` / `GA_API_SECRET`; `None` when either
    /// is unset, which disables tracking entirely.
    pub fn from_env() -> Option<Self> {
        let measurement_id = std::env::var("GA_MEASUREMENT_ID").ok()?;
        let api_secret = std::env::var("GA_API_SECRET").ok()?;

        Some(Self {
            measurement_id,
            api_secret,
            endpoint: MEASUREMENT_ENDPOINT.to_string(),
        })
    }
}

/// Fire-and-forget analytics client
pub struct AnalyticsClient {
    config: AnalyticsConfig,
    client: reqwest::Client,
}

impl AnalyticsClient {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Build the purchase event body for a completed session.
    pub fn purchase_event(session: &SessionDetail, payment_reference: &str) -> serde_json::Value {
        let currency = session.settlement_currency();
        let value = session.amount_total_minor as f64 / currency.minor_unit_divisor() as f64;

        serde_json::json!({
            "client_id": session.id,
            "events": [{
                "name": "purchase",
                "params": {
                    "transaction_id": payment_reference,
                    "currency": currency.code(),
                    "value": value,
                }
            }]
        })
    }

    /// Dispatch a purchase ping on a detached task. Failures are logged,
    /// never rejoined into the caller's flow.
    pub fn spawn_purchase_ping(&self, session: &SessionDetail) {
        let payment_reference = session
            .payment_reference
            .clone()
            .unwrap_or_else(|| session.id.clone());
        let body = Self::purchase_event(session, &payment_reference);
        let url = format!(
            "{}?measurement_id={}&api_secret={}",
            self.config.endpoint, self.config.measurement_id, self.config.api_secret
        );
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Conversion ping sent: transaction={}", payment_reference);
                }
                Ok(response) => {
                    error!(
                        "Conversion ping rejected: status={}, transaction={}",
                        response.status(),
                        payment_reference
                    );
                }
                Err(e) => {
                    error!("Conversion ping failed: {}", e);
                }
            }
        });

        debug!("Conversion ping dispatched for session {}", session.id);
    }
}
