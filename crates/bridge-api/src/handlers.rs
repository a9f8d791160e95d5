//! # Request Handlers
//!
//! Axum request handlers for the checkout bridge: session creation, the
//! thank-you-page order summary, the webhook endpoint, and health.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bridge_core::{
    assemble_session_request, Address, BridgeError, CartItem, CartSnapshot, Money, SessionDetail,
    SHIPPING_LINE_NAME,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout session request, as the storefront sends it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Cart lines, priced in minor units of `currency`
    #[serde(default)]
    pub cart_items: Vec<CartItemDto>,
    /// Checkout currency code
    pub currency: String,
    /// Destination country for shipping
    #[serde(default)]
    pub country_code: Option<String>,
    /// Optional: pre-fill email
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Optional: marketing consent captured at cart stage
    #[serde(default)]
    pub marketing_consent: Option<bool>,
    /// Storefront cart token for restoration
    #[serde(default)]
    pub cart_token: Option<String>,
}

/// Cart line in the create request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub handle: String,
    pub variant_id: i64,
    pub title: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Unit price, already in minor units
    pub price: i64,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl CreateSessionRequest {
    fn into_snapshot(self) -> CartSnapshot {
        CartSnapshot {
            items: self
                .cart_items
                .into_iter()
                .map(|item| CartItem {
                    product_handle: item.handle,
                    variant_id: item.variant_id,
                    title: item.title,
                    quantity: item.quantity,
                    unit_price_minor: item.price,
                    image_url: item.image,
                })
                .collect(),
            currency: self.currency,
            destination_country: self.country_code,
            customer_email: self.customer_email,
            marketing_consent: self.marketing_consent,
            cart_token: self.cart_token,
        }
    }
}

/// Create checkout session response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub checkout_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Order summary item for the thank-you page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    pub name: String,
    pub quantity: u32,
    /// Minor units
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Order summary for the thank-you page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    #[serde(rename = "session_id")]
    pub session_id: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub items: Vec<OrderSummaryItem>,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount_total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    pub total: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }
}

fn bridge_error_to_response(err: BridgeError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "checkout-bridge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a checkout session from storefront cart data
#[instrument(skip(state, request), fields(items = request.cart_items.len(), currency = %request.currency))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let cart = request.into_snapshot();

    let session_request =
        assemble_session_request(&cart, &state.shipping).map_err(bridge_error_to_response)?;

    info!(
        "Creating checkout session: {} items, subtotal={}",
        cart.item_count(),
        Money::from_minor(cart.subtotal_minor(), session_request.currency).display()
    );

    let created = state
        .gateway
        .create_session(
            &session_request,
            &state.config.success_url(),
            &state.config.cancel_redirect_url,
        )
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            bridge_error_to_response(e)
        })?;

    info!("Created checkout session: {}", created.session_id);

    Ok(Json(CreateSessionResponse {
        session_id: created.session_id,
        checkout_url: created.checkout_url,
        expires_at: created.expires_at.map(|t| t.to_rfc3339()),
    }))
}

/// Retrieve a completed session as an order summary
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<OrderSummaryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session = state
        .gateway
        .retrieve_session(&session_id)
        .await
        .map_err(bridge_error_to_response)?;

    if !session.is_paid() {
        return Err(bridge_error_to_response(BridgeError::PaymentIncomplete {
            session_id,
        }));
    }

    Ok(Json(build_order_summary(session)))
}

/// Merge metadata cart items (variant ids) with processor line items
/// (images); fall back to processor items alone when the snapshot is gone.
fn build_order_summary(session: SessionDetail) -> OrderSummaryResponse {
    let product_lines: Vec<_> = session
        .line_items
        .iter()
        .filter(|item| item.name != SHIPPING_LINE_NAME)
        .collect();

    let metadata_items = session.metadata_cart_items();

    let items: Vec<OrderSummaryItem> = if metadata_items.is_empty() {
        product_lines
            .iter()
            .map(|line| OrderSummaryItem {
                variant_id: None,
                name: line.name.clone(),
                quantity: line.quantity,
                price: line.amount_total_minor,
                image: line.image_url.clone(),
            })
            .collect()
    } else {
        metadata_items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let line = product_lines.get(index);
                OrderSummaryItem {
                    variant_id: Some(item.variant_id),
                    name: line.map(|l| l.name.clone()).unwrap_or_default(),
                    quantity: item.quantity,
                    price: item.price,
                    image: line.and_then(|l| l.image_url.clone()),
                }
            })
            .collect()
    };

    let customer = session.customer_details.as_ref();

    OrderSummaryResponse {
        session_id: session.id.clone(),
        order_id: session.id.clone(),
        customer_email: customer.and_then(|c| c.email.clone()),
        customer_phone: customer.and_then(|c| c.phone.clone()),
        items,
        subtotal: session.amount_subtotal_minor,
        shipping: session.shipping_line_total_minor(),
        discount_total: session
            .discount
            .as_ref()
            .map(|d| d.amount_minor)
            .unwrap_or(0),
        discount_code: session.discount.as_ref().map(|d| d.code.clone()),
        total: session.amount_total_minor,
        currency: session.currency.clone(),
        shipping_address: session.shipping_address().cloned(),
    }
}

/// Webhook acknowledgment body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}

/// Handle a delivered payment lifecycle event.
///
/// The raw body is read whole before anything parses it; the signature is
/// over those exact bytes. Transport-level problems (missing or invalid
/// signature) are the only rejections; once verified, the delivery is
/// acknowledged whatever the business outcome, so the sender does not
/// retry failures retries cannot fix.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Stripe-Signature header", 400)),
            )
        })?;

    let event = state.gateway.verify_event(&body, signature).map_err(|e| {
        error!("Webhook verification failed: {}", e);
        bridge_error_to_response(e)
    })?;

    info!(
        "Received webhook: type={:?}, id={}, session={:?}",
        event.kind, event.id, event.session_id
    );

    let outcome = state.reconciler.handle_event(&event).await;

    Ok((
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            outcome: outcome.label(),
        }),
    ))
}
