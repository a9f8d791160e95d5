//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API behind the
//! `PaymentGateway` trait. Hosted checkout keeps card data off the bridge
//! entirely; the session id is the correlation key everything else hangs
//! off.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use bridge_core::{
    Address, BridgeError, BridgeResult, CreatedSession, CustomerDetails, CustomerRecord,
    DiscountInfo, LifecycleEvent, PaymentGateway, SessionDetail, SessionLineItem, SessionRequest,
    ShippingDetails,
};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Countries the store delivers to; sent with every session so the hosted
/// page only offers valid destinations.
pub const ALLOWED_SHIPPING_COUNTRIES: &[&str] = &[
    // GCC / Middle East
    "AE", "SA", "KW", "BH", "OM", "QA", "LB",
    // Europe
    "GB", "DE", "FR", "IT", "ES", "NL", "BE", "AT", "CH", "PT", "IE", "PL", "GR", "SE", "DK",
    "FI", "NO", "CZ", "HU", "RO", "BG", "HR", "SI", "EE", "CY", "MT", "LU", "AD", "MC", "LI",
    "AL", "BA", "ME", "RS",
    // USA
    "US",
];

/// Stripe gateway over the Checkout Sessions API
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> BridgeResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Build the form-encoded body for session creation
    fn build_form_params(
        request: &SessionRequest,
        success_url: &str,
        cancel_url: &str,
    ) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "billing_address_collection".to_string(),
                "required".to_string(),
            ),
            (
                "phone_number_collection[enabled]".to_string(),
                "true".to_string(),
            ),
            ("allow_promotion_codes".to_string(), "true".to_string()),
        ];

        for (i, country) in ALLOWED_SHIPPING_COUNTRIES.iter().enumerate() {
            params.push((
                format!("shipping_address_collection[allowed_countries][{}]", i),
                country.to_string(),
            ));
        }

        for (i, line) in request.lines.iter().enumerate() {
            params.push((
                format!("line_items[{}][price_data][currency]", i),
                request.currency.as_str().to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                line.unit_amount_minor.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                line.name.clone(),
            ));
            if let Some(ref desc) = line.description {
                params.push((
                    format!("line_items[{}][price_data][product_data][description]", i),
                    desc.clone(),
                ));
            }
            if let Some(ref image) = line.image_url {
                params.push((
                    format!("line_items[{}][price_data][product_data][images][0]", i),
                    image.clone(),
                ));
            }
            params.push((
                format!("line_items[{}][quantity]", i),
                line.quantity.to_string(),
            ));
        }

        if let Some(ref email) = request.customer_email {
            params.push(("customer_email".to_string(), email.clone()));
        }

        // Bounded expiry window makes abandoned sessions detectable
        let expires_at = Utc::now() + request.expires_in;
        params.push(("expires_at".to_string(), expires_at.timestamp().to_string()));

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }

    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> BridgeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(BridgeError::BackendCall {
                    service: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(BridgeError::BackendCall {
                service: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            BridgeError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn create_session(
        &self,
        request: &SessionRequest,
        success_url: &str,
        cancel_url: &str,
    ) -> BridgeResult<CreatedSession> {
        let params = Self::build_form_params(request, success_url, cancel_url);

        debug!(
            "Creating Stripe checkout session: {} lines, currency={}",
            request.lines.len(),
            request.currency
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        let session: StripeSessionCreateResponse = Self::read_response(response).await?;

        info!(
            "Created Stripe checkout session: id={}, url={}",
            session.id, session.url
        );

        Ok(CreatedSession {
            session_id: session.id,
            checkout_url: session.url,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> BridgeResult<SessionDetail> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("expand[]", "line_items"),
                ("expand[]", "customer_details"),
                ("expand[]", "payment_intent"),
                ("expand[]", "total_details.breakdown"),
            ])
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BridgeError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }

        let session: StripeSessionResponse = Self::read_response(response).await?;
        Ok(normalize_session(session))
    }

    #[instrument(skip(self))]
    async fn retrieve_customer(&self, customer_ref: &str) -> BridgeResult<CustomerRecord> {
        let url = format!("{}/v1/customers/{}", self.config.api_base_url, customer_ref);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        Self::read_response(response).await
    }

    fn verify_event(&self, payload: &[u8], signature: &str) -> BridgeResult<LifecycleEvent> {
        webhook::verify_and_parse(&self.config.webhook_secret, payload, signature)
    }
}

/// Normalize the Stripe session wire shape into the bridge's session model
fn normalize_session(session: StripeSessionResponse) -> SessionDetail {
    let discount = session
        .total_details
        .and_then(|t| t.breakdown)
        .map(|b| b.discounts)
        .and_then(|discounts| discounts.into_iter().next())
        .map(|d| {
            let code = d
                .discount
                .as_ref()
                .and_then(|meta| {
                    meta.coupon
                        .as_ref()
                        .and_then(|c| c.name.clone())
                        .or_else(|| meta.promotion_code.clone())
                })
                .unwrap_or_else(|| "DISCOUNT".to_string());
            DiscountInfo {
                code,
                amount_minor: d.amount,
            }
        });

    let line_items = session
        .line_items
        .map(|l| l.data)
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let product = item.price.as_ref().and_then(|p| p.product.as_ref());
            let name = item
                .description
                .or_else(|| product.and_then(|p| p.name.clone()))
                .unwrap_or_default();
            SessionLineItem {
                name,
                quantity: item.quantity.unwrap_or(1),
                amount_total_minor: item.amount_total.unwrap_or(0),
                image_url: product
                    .and_then(|p| p.images.as_ref())
                    .and_then(|imgs| imgs.first().cloned()),
            }
        })
        .collect();

    SessionDetail {
        id: session.id,
        payment_status: session.payment_status.unwrap_or_default(),
        currency: session.currency.unwrap_or_default().to_uppercase(),
        amount_subtotal_minor: session.amount_subtotal.unwrap_or(0),
        amount_total_minor: session.amount_total.unwrap_or(0),
        line_items,
        customer_details: session.customer_details.map(|c| CustomerDetails {
            email: c.email,
            name: c.name,
            phone: c.phone,
            address: c.address.map(normalize_address),
        }),
        shipping_details: session.shipping_details.map(|s| ShippingDetails {
            name: s.name,
            address: s.address.map(normalize_address),
        }),
        customer_email: session.customer_email,
        customer_ref: session.customer.and_then(|c| match c {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Object(obj) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from),
            _ => None,
        }),
        payment_reference: session.payment_intent.and_then(|p| match p {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Object(obj) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from),
            _ => None,
        }),
        promotional_consent: session
            .consent
            .and_then(|c| c.promotional_communications)
            .map(|v| v == "accepted"),
        discount,
        metadata: session.metadata.unwrap_or_default(),
    }
}

fn normalize_address(address: StripeAddress) -> Address {
    Address {
        line1: address.line1,
        line2: address.line2,
        city: address.city,
        state: address.state,
        country: address.country,
        postal_code: address.postal_code,
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionCreateResponse {
    id: String,
    url: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    amount_subtotal: Option<i64>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    customer_details: Option<StripePartyDetails>,
    #[serde(default)]
    shipping_details: Option<StripePartyDetails>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer: Option<serde_json::Value>,
    #[serde(default)]
    payment_intent: Option<serde_json::Value>,
    #[serde(default)]
    consent: Option<StripeConsent>,
    #[serde(default)]
    total_details: Option<StripeTotalDetails>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    line_items: Option<StripeLineItemList>,
}

#[derive(Debug, Deserialize)]
struct StripePartyDetails {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<StripeAddress>,
}

#[derive(Debug, Deserialize)]
struct StripeAddress {
    #[serde(default)]
    line1: Option<String>,
    #[serde(default)]
    line2: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeConsent {
    #[serde(default)]
    promotional_communications: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeTotalDetails {
    #[serde(default)]
    breakdown: Option<StripeBreakdown>,
}

#[derive(Debug, Deserialize)]
struct StripeBreakdown {
    #[serde(default)]
    discounts: Vec<StripeDiscountEntry>,
}

#[derive(Debug, Deserialize)]
struct StripeDiscountEntry {
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    discount: Option<StripeDiscountMeta>,
}

#[derive(Debug, Deserialize)]
struct StripeDiscountMeta {
    #[serde(default)]
    coupon: Option<StripeCoupon>,
    #[serde(default)]
    promotion_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCoupon {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItemList {
    #[serde(default)]
    data: Vec<StripeLineItem>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    #[serde(default)]
    product: Option<StripeProduct>,
}

#[derive(Debug, Deserialize)]
struct StripeProduct {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
