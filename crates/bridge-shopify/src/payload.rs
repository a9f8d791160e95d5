//! # Order and Draft-Order Payload Builders
//!
//! Turns the bridge's domain payloads into Shopify Admin API wire shapes.
//! This is the one boundary where minor units become major-unit decimal
//! strings; everything upstream stays integer. The payment reference rides
//! along as a tag so a human can trace any order back to its transaction.

use bridge_core::{
    major_units_string, Address, Currency, DraftOrderPayload, OrderPayload, REFERENCE_CURRENCY,
};
use serde::Serialize;

/// Wire envelope for order creation
#[derive(Debug, Serialize)]
pub struct ShopifyOrderRequest {
    pub order: ShopifyOrder,
}

#[derive(Debug, Serialize)]
pub struct ShopifyOrder {
    pub email: String,
    pub customer: ShopifyCustomer,
    pub financial_status: String,
    pub send_receipt: bool,
    pub send_fulfillment_receipt: bool,
    pub note: String,
    pub note_attributes: Vec<NoteAttribute>,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_codes: Option<Vec<ShopifyDiscountCode>>,
    pub currency: String,
    pub line_items: Vec<ShopifyLineItem>,
    pub shipping_address: ShopifyAddress,
    pub billing_address: ShopifyAddress,
    pub shipping_lines: Vec<ShopifyShippingLine>,
    pub transactions: Vec<ShopifyTransaction>,
}

#[derive(Debug, Serialize)]
pub struct ShopifyCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub accepts_marketing: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ShopifyDiscountCode {
    pub code: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct ShopifyLineItem {
    pub variant_id: i64,
    pub quantity: u32,
    /// Major-unit decimal string
    pub price: String,
}

#[derive(Debug, Serialize)]
pub struct ShopifyAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub country: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShopifyShippingLine {
    pub title: String,
    pub price: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ShopifyTransaction {
    pub kind: String,
    pub status: String,
    pub amount: String,
    pub gateway: String,
}

/// Wire envelope for draft-order creation
#[derive(Debug, Serialize)]
pub struct ShopifyDraftOrderRequest {
    pub draft_order: ShopifyDraftOrder,
}

#[derive(Debug, Serialize)]
pub struct ShopifyDraftOrder {
    pub email: String,
    pub line_items: Vec<ShopifyDraftLineItem>,
    pub customer: ShopifyDraftCustomer,
    pub note: String,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShopifyAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<ShopifyAppliedDiscount>,
}

#[derive(Debug, Serialize)]
pub struct ShopifyDraftLineItem {
    pub variant_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct ShopifyDraftCustomer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShopifyAppliedDiscount {
    pub description: String,
    pub value_type: String,
    pub value: String,
    pub amount: String,
}

fn settlement_currency(code: &str) -> Currency {
    Currency::from_code(code).unwrap_or(REFERENCE_CURRENCY)
}

/// Build the order-creation payload for a completed, paid session.
pub fn build_order_payload(order: &OrderPayload) -> ShopifyOrderRequest {
    let currency = settlement_currency(&order.currency);

    let note = match &order.discount {
        Some(discount) => format!("Promo Code: {}", discount.code),
        None => String::new(),
    };

    let mut note_attributes = vec![NoteAttribute {
        name: "stripe_payment_id".to_string(),
        value: order.payment_reference.clone(),
    }];
    if let Some(discount) = &order.discount {
        note_attributes.push(NoteAttribute {
            name: "discount_code".to_string(),
            value: discount.code.clone(),
        });
        note_attributes.push(NoteAttribute {
            name: "discount_amount".to_string(),
            value: format!(
                "{} {}",
                major_units_string(discount.amount_minor, currency),
                currency
            ),
        });
    }

    let mut tags = format!(
        "stripe-checkout, multi-currency, stripe:{}",
        order.payment_reference
    );
    if let Some(discount) = &order.discount {
        tags.push_str(&format!(", promo:{}", discount.code));
    }

    let discount_codes = order.discount.as_ref().map(|discount| {
        vec![ShopifyDiscountCode {
            code: discount.code.clone(),
            amount: major_units_string(discount.amount_minor, currency),
            kind: "fixed_amount".to_string(),
        }]
    });

    let address = wire_address(
        &order.shipping_address,
        &order.first_name,
        &order.last_name,
        order.phone.as_deref(),
    );

    // Zero-value transactions are rejected downstream; floor to the
    // smallest positive unit.
    let transaction_minor = order.total_minor.max(1);

    ShopifyOrderRequest {
        order: ShopifyOrder {
            email: order.email.clone(),
            customer: ShopifyCustomer {
                first_name: order.first_name.clone(),
                last_name: order.last_name.clone(),
                email: order.email.clone(),
                accepts_marketing: order.accepts_marketing,
            },
            financial_status: "paid".to_string(),
            send_receipt: true,
            send_fulfillment_receipt: true,
            note,
            note_attributes,
            tags,
            discount_codes,
            currency: currency.code(),
            line_items: order
                .items
                .iter()
                .map(|item| ShopifyLineItem {
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    price: major_units_string(item.price, currency),
                })
                .collect(),
            billing_address: wire_address(
                &order.shipping_address,
                &order.first_name,
                &order.last_name,
                order.phone.as_deref(),
            ),
            shipping_address: address,
            shipping_lines: vec![ShopifyShippingLine {
                title: "International Shipping".to_string(),
                price: major_units_string(order.shipping_minor, currency),
                code: "INTL".to_string(),
            }],
            transactions: vec![ShopifyTransaction {
                kind: "sale".to_string(),
                status: "success".to_string(),
                amount: major_units_string(transaction_minor, currency),
                gateway: "Stripe".to_string(),
            }],
        },
    }
}

/// Build the recovery draft-order payload for an abandoned session.
pub fn build_draft_order_payload(draft: &DraftOrderPayload) -> ShopifyDraftOrderRequest {
    let currency = settlement_currency(&draft.currency);

    let note = match &draft.discount {
        Some(discount) => format!(
            "Abandoned Stripe checkout - Session: {}\nPromo Code Used: {}",
            draft.session_id, discount.code
        ),
        None => format!("Abandoned Stripe checkout - Session: {}", draft.session_id),
    };

    let applied_discount = draft
        .discount
        .as_ref()
        .filter(|discount| discount.amount_minor > 0)
        .map(|discount| {
            let amount = major_units_string(discount.amount_minor, currency);
            ShopifyAppliedDiscount {
                description: discount.code.clone(),
                value_type: "fixed_amount".to_string(),
                value: amount.clone(),
                amount,
            }
        });

    let shipping_address = draft.shipping_address.as_ref().map(|address| {
        wire_address(
            address,
            draft.first_name.as_deref().unwrap_or("Customer"),
            draft.last_name.as_deref().unwrap_or(""),
            draft.phone.as_deref(),
        )
    });

    ShopifyDraftOrderRequest {
        draft_order: ShopifyDraftOrder {
            email: draft.email.clone(),
            line_items: draft
                .items
                .iter()
                .map(|item| ShopifyDraftLineItem {
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                })
                .collect(),
            customer: ShopifyDraftCustomer {
                email: draft.email.clone(),
                first_name: draft.first_name.clone(),
                last_name: draft.last_name.clone(),
            },
            note,
            tags: "abandoned-checkout, stripe-recovery".to_string(),
            shipping_address,
            phone: draft.phone.clone(),
            applied_discount,
        },
    }
}

fn wire_address(
    address: &Address,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
) -> ShopifyAddress {
    ShopifyAddress {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        address1: address.line1.clone().unwrap_or_default(),
        address2: address.line2.clone(),
        city: address.city.clone().unwrap_or_default(),
        province: address.state.clone(),
        country: address.country.clone().unwrap_or_default(),
        zip: address.postal_code.clone().unwrap_or_default(),
        phone: phone.map(String::from),
    }
}
