//! # Shopify Admin API Client
//!
//! `OrderBackend` implementation over the Shopify Admin REST API: order and
//! draft-order creation plus the customer search/create/update calls the
//! recovery flow uses to guarantee a durable customer record.

use crate::config::ShopifyConfig;
use crate::payload::{build_draft_order_payload, build_order_payload};
use async_trait::async_trait;
use bridge_core::{
    BackendCustomer, BackendOrderRef, BridgeError, BridgeResult, CustomerUpsert,
    DraftOrderPayload, OrderBackend, OrderPayload,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Shopify Admin API client
pub struct ShopifyClient {
    config: ShopifyConfig,
    client: Client,
}

impl ShopifyClient {
    /// Create a new client
    pub fn new(config: ShopifyConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> BridgeResult<Self> {
        let config = ShopifyConfig::from_env()?;
        Ok(Self::new(config))
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
            error!("Shopify API error: status={}, body={}", status, body);
            return Err(BridgeError::BackendCall {
                service: "shopify".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            BridgeError::Serialization(format!("Failed to parse Shopify response: {}", e))
        })
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        body: &B,
    ) -> BridgeResult<T> {
        let response = self
            .client
            .post(self.config.resource_url(resource))
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        Self::read_response(response).await
    }
}

#[async_trait]
impl OrderBackend for ShopifyClient {
    #[instrument(skip(self, order), fields(payment_reference = %order.payment_reference))]
    async fn create_order(&self, order: &OrderPayload) -> BridgeResult<BackendOrderRef> {
        let request = build_order_payload(order);
        let created: OrderEnvelope = self.post_json("orders.json", &request).await?;

        info!(
            "Created Shopify order: id={:?}, number={:?}",
            created.order.id, created.order.order_number
        );

        Ok(BackendOrderRef {
            id: created.order.id,
            order_number: created.order.order_number,
        })
    }

    #[instrument(skip(self, draft), fields(session_id = %draft.session_id))]
    async fn create_draft_order(&self, draft: &DraftOrderPayload) -> BridgeResult<BackendOrderRef> {
        let request = build_draft_order_payload(draft);
        let created: DraftOrderEnvelope = self.post_json("draft_orders.json", &request).await?;

        info!("Created Shopify draft order: id={:?}", created.draft_order.id);

        Ok(BackendOrderRef {
            id: created.draft_order.id,
            order_number: None,
        })
    }

    #[instrument(skip(self))]
    async fn find_customer_by_email(&self, email: &str) -> BridgeResult<Option<BackendCustomer>> {
        let response = self
            .client
            .get(self.config.resource_url("customers/search.json"))
            .query(&[("query", format!("email:{}", email))])
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        let found: CustomerSearchEnvelope = Self::read_response(response).await?;

        Ok(found
            .customers
            .into_iter()
            .next()
            .map(|c| BackendCustomer {
                id: c.id,
                email: c.email.unwrap_or_default(),
            }))
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create_customer(&self, customer: &CustomerUpsert) -> BridgeResult<BackendCustomer> {
        let request = CustomerEnvelopeRequest {
            customer: wire_customer(customer),
        };
        let created: CustomerEnvelope = self.post_json("customers.json", &request).await?;

        Ok(BackendCustomer {
            id: created.customer.id,
            email: created.customer.email.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, customer))]
    async fn update_customer(
        &self,
        customer_id: i64,
        customer: &CustomerUpsert,
    ) -> BridgeResult<BackendCustomer> {
        let request = CustomerEnvelopeRequest {
            customer: wire_customer(customer),
        };

        let response = self
            .client
            .put(self
                .config
                .resource_url(&format!("customers/{}.json", customer_id)))
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        let updated: CustomerEnvelope = Self::read_response(response).await?;

        Ok(BackendCustomer {
            id: updated.customer.id,
            email: updated.customer.email.unwrap_or_default(),
        })
    }
}

fn wire_customer(customer: &CustomerUpsert) -> WireCustomer {
    WireCustomer {
        email: customer.email.clone(),
        first_name: customer.first_name.clone(),
        last_name: customer.last_name.clone(),
        accepts_marketing: customer.accepts_marketing,
        tags: customer.tags.clone(),
    }
}

// =============================================================================
// Shopify wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct CustomerEnvelopeRequest {
    customer: WireCustomer,
}

#[derive(Debug, Serialize)]
struct WireCustomer {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    accepts_marketing: bool,
    tags: String,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: OrderRef,
}

#[derive(Debug, Deserialize)]
struct OrderRef {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    order_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DraftOrderEnvelope {
    draft_order: DraftOrderRef,
}

#[derive(Debug, Deserialize)]
struct DraftOrderRef {
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CustomerSearchEnvelope {
    #[serde(default)]
    customers: Vec<CustomerRef>,
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    customer: CustomerRef,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: i64,
    #[serde(default)]
    email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{Address, DiscountInfo, MetadataCartItem};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ShopifyClient {
        ShopifyClient::new(
            ShopifyConfig::new("example.myshopify.com", "shpat_test").with_base_url(server.uri()),
        )
    }

    fn order_payload() -> OrderPayload {
        OrderPayload {
            email: "buyer@example.com".into(),
            first_name: "Aisha".into(),
            last_name: "Al Amiri".into(),
            phone: None,
            items: vec![MetadataCartItem {
                variant_id: 42,
                quantity: 2,
                price: 10000,
            }],
            shipping_address: Address {
                line1: Some("1 Marina Walk".into()),
                city: Some("Dubai".into()),
                country: Some("AE".into()),
                postal_code: Some("00000".into()),
                ..Default::default()
            },
            currency: "USD".into(),
            total_minor: 21650,
            shipping_minor: 1650,
            payment_reference: "pi_abc".into(),
            discount: Some(DiscountInfo {
                code: "WELCOME10".into(),
                amount_minor: 1000,
            }),
            accepts_marketing: true,
        }
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/orders.json"))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .and(body_string_contains("\"variant_id\":42"))
            .and(body_string_contains("stripe:pi_abc"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "order": { "id": 9001, "order_number": 1234 }
            })))
            .mount(&server)
            .await;

        let created = client(&server).create_order(&order_payload()).await.unwrap();

        assert_eq!(created.id, Some(9001));
        assert_eq!(created.order_number, Some(1234));
    }

    #[tokio::test]
    async fn test_create_order_failure_is_backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/orders.json"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"errors": {"line_items": "invalid"}})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create_order(&order_payload())
            .await
            .unwrap_err();

        match err {
            BridgeError::BackendCall { service, message } => {
                assert_eq!(service, "shopify");
                assert!(message.contains("422"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_draft_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/draft_orders.json"))
            .and(body_string_contains("abandoned-checkout"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "draft_order": { "id": 7007 }
            })))
            .mount(&server)
            .await;

        let draft = DraftOrderPayload {
            email: "ghost@example.com".into(),
            first_name: None,
            last_name: None,
            phone: None,
            items: vec![MetadataCartItem {
                variant_id: 42,
                quantity: 1,
                price: 4500,
            }],
            shipping_address: None,
            session_id: "cs_test_123".into(),
            discount: None,
            currency: "USD".into(),
            accepts_marketing: false,
        };

        let created = client(&server).create_draft_order(&draft).await.unwrap();
        assert_eq!(created.id, Some(7007));
    }

    #[tokio::test]
    async fn test_find_customer_by_email() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-01/customers/search.json"))
            .and(query_param("query", "email:ghost@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customers": [{ "id": 555, "email": "ghost@example.com" }]
            })))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_customer_by_email("ghost@example.com")
            .await
            .unwrap();

        let customer = found.unwrap();
        assert_eq!(customer.id, 555);
        assert_eq!(customer.email, "ghost@example.com");
    }

    #[tokio::test]
    async fn test_find_customer_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-01/customers/search.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"customers": []})),
            )
            .mount(&server)
            .await;

        let found = client(&server)
            .find_customer_by_email("nobody@example.com")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_and_update_customer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/customers.json"))
            .and(body_string_contains("accepts_marketing"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "customer": { "id": 555, "email": "ghost@example.com" }
            })))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/admin/api/2024-01/customers/555.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customer": { "id": 555, "email": "ghost@example.com" }
            })))
            .mount(&server)
            .await;

        let upsert = CustomerUpsert {
            email: "ghost@example.com".into(),
            first_name: Some("Aisha".into()),
            last_name: None,
            accepts_marketing: true,
            tags: "abandoned-checkout".into(),
        };

        let shopify = client(&server);
        let created = shopify.create_customer(&upsert).await.unwrap();
        assert_eq!(created.id, 555);

        let updated = shopify.update_customer(555, &upsert).await.unwrap();
        assert_eq!(updated.email, "ghost@example.com");
    }
}
