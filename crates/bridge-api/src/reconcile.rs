//! # Event Reconciliation
//!
//! Turns verified payment lifecycle events into durable backend records:
//! a paid order for a completed session, a recovery draft order for an
//! expired one. The inbound event is only a trigger; every decision is
//! made from the re-fetched, authoritative session.
//!
//! Nothing past signature verification is allowed to escape as an error.
//! Payment has already been captured by the time a completed event
//! arrives, so a failed backend call is logged for manual reconciliation
//! and the event is still acknowledged; a retry storm cannot fix missing
//! data and is not wanted.

use crate::analytics::AnalyticsClient;
use bridge_core::{
    BackendOrderRef, BoxedOrderBackend, BoxedPaymentGateway, BridgeError, CustomerUpsert,
    DraftOrderPayload, LifecycleEvent, LifecycleEventKind, OrderPayload, SessionDetail,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Why an event was acknowledged without creating anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Metadata cart snapshot empty or unparsable; an order cannot be
    /// fabricated from partial data
    MissingCartData,
    /// No shipping address resolvable from the session
    MissingAddress,
    /// No contact email discoverable by any strategy; recovery is
    /// impossible without a channel
    NoEmail,
    /// Event type carries no business logic
    UnhandledEvent,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingCartData => "missing_cart_data",
            SkipReason::MissingAddress => "missing_address",
            SkipReason::NoEmail => "no_email",
            SkipReason::UnhandledEvent => "unhandled_event",
        }
    }
}

/// Terminal result of processing one event delivery
#[derive(Debug)]
pub enum ReconciliationOutcome {
    OrderCreated(BackendOrderRef),
    DraftOrderCreated(BackendOrderRef),
    Skipped(SkipReason),
    Failed(String),
}

impl ReconciliationOutcome {
    /// Short label for the acknowledgment body and logs
    pub fn label(&self) -> String {
        match self {
            ReconciliationOutcome::OrderCreated(_) => "order_created".to_string(),
            ReconciliationOutcome::DraftOrderCreated(_) => "draft_order_created".to_string(),
            ReconciliationOutcome::Skipped(reason) => format!("skipped:{}", reason.as_str()),
            ReconciliationOutcome::Failed(_) => "failed".to_string(),
        }
    }
}

/// Ordered email-discovery strategies for abandoned sessions. The first
/// non-empty result wins; the async processor-customer lookup runs only
/// when all of these come up empty.
const EMAIL_STRATEGIES: &[fn(&SessionDetail) -> Option<String>] = &[
    precaptured_metadata_email,
    customer_details_email,
    session_fallback_email,
];

fn precaptured_metadata_email(session: &SessionDetail) -> Option<String> {
    non_empty(session.metadata.get("customer_email").cloned())
}

fn customer_details_email(session: &SessionDetail) -> Option<String> {
    non_empty(
        session
            .customer_details
            .as_ref()
            .and_then(|c| c.email.clone()),
    )
}

fn session_fallback_email(session: &SessionDetail) -> Option<String> {
    non_empty(session.customer_email.clone())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Stateless event processor. Everything it needs is re-derived from the
/// session id on each delivery; duplicate deliveries are tolerated and
/// deduplicated by the backend's payment-reference tag, not here.
pub struct Reconciler {
    gateway: BoxedPaymentGateway,
    backend: BoxedOrderBackend,
    analytics: Option<Arc<AnalyticsClient>>,
}

impl Reconciler {
    pub fn new(
        gateway: BoxedPaymentGateway,
        backend: BoxedOrderBackend,
        analytics: Option<Arc<AnalyticsClient>>,
    ) -> Self {
        Self {
            gateway,
            backend,
            analytics,
        }
    }

    /// Process one verified event. Never returns an error; the caller
    /// acknowledges the delivery whatever happens here.
    #[instrument(skip(self, event), fields(event_id = %event.id, kind = ?event.kind))]
    pub async fn handle_event(&self, event: &LifecycleEvent) -> ReconciliationOutcome {
        let outcome = match &event.kind {
            LifecycleEventKind::SessionCompleted => self.handle_completed(event).await,
            LifecycleEventKind::SessionExpired => self.handle_expired(event).await,
            LifecycleEventKind::Other(kind) => {
                // Explicit no-op: acknowledged, no side effect
                info!("Ignoring event type: {}", kind);
                ReconciliationOutcome::Skipped(SkipReason::UnhandledEvent)
            }
        };

        info!("Event {} -> {}", event.id, outcome.label());
        outcome
    }

    async fn handle_completed(&self, event: &LifecycleEvent) -> ReconciliationOutcome {
        let session = match self.fetch_session(event).await {
            Ok(session) => session,
            Err(outcome) => return outcome,
        };

        // Line items come strictly from the metadata snapshot; the
        // processor's own representation lost the variant ids.
        let items = session.metadata_cart_items();
        if items.is_empty() {
            warn!(
                "Session {} completed with no cart snapshot in metadata",
                session.id
            );
            return ReconciliationOutcome::Skipped(SkipReason::MissingCartData);
        }

        let order = match OrderPayload::from_session(&session, items, session.discount.clone()) {
            Ok(order) => order,
            Err(BridgeError::MissingData(reason)) => {
                warn!("Session {}: {}", session.id, reason);
                return ReconciliationOutcome::Skipped(SkipReason::MissingAddress);
            }
            Err(e) => return ReconciliationOutcome::Failed(e.to_string()),
        };

        match self.backend.create_order(&order).await {
            Ok(created) => {
                info!(
                    "Order created for session {}: id={:?}",
                    session.id, created.id
                );
                if let Some(analytics) = &self.analytics {
                    analytics.spawn_purchase_ping(&session);
                }
                ReconciliationOutcome::OrderCreated(created)
            }
            Err(e) => {
                // Money already moved; log for manual resolution, do not
                // re-raise into the delivery path.
                error!(
                    "Failed to create order for session {}: {}",
                    session.id, e
                );
                ReconciliationOutcome::Failed(e.to_string())
            }
        }
    }

    async fn handle_expired(&self, event: &LifecycleEvent) -> ReconciliationOutcome {
        let session = match self.fetch_session(event).await {
            Ok(session) => session,
            Err(outcome) => return outcome,
        };

        let email = match self.discover_email(&session).await {
            Some(email) => email,
            None => {
                info!(
                    "Expired session {} has no discoverable email, skipping recovery",
                    session.id
                );
                return ReconciliationOutcome::Skipped(SkipReason::NoEmail);
            }
        };

        let items = session.metadata_cart_items();
        if items.is_empty() {
            info!("Expired session {} carried no cart snapshot", session.id);
            return ReconciliationOutcome::Skipped(SkipReason::MissingCartData);
        }

        let draft =
            DraftOrderPayload::from_session(&session, items, email.clone(), session.discount.clone());

        // Draft-order creation alone does not guarantee a durable customer
        // record with correct consent; run that independently, unawaited.
        self.spawn_customer_upsert(&draft);

        match self.backend.create_draft_order(&draft).await {
            Ok(created) => {
                info!(
                    "Recovery draft created for session {}: id={:?}, email={}",
                    session.id, created.id, email
                );
                ReconciliationOutcome::DraftOrderCreated(created)
            }
            Err(e) => {
                error!(
                    "Failed to create draft order for session {}: {}",
                    session.id, e
                );
                ReconciliationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Re-fetch the authoritative session for an event.
    async fn fetch_session(
        &self,
        event: &LifecycleEvent,
    ) -> Result<SessionDetail, ReconciliationOutcome> {
        let session_id = match &event.session_id {
            Some(id) => id,
            None => {
                warn!("Event {} carried no session id", event.id);
                return Err(ReconciliationOutcome::Failed(
                    "event carried no session id".to_string(),
                ));
            }
        };

        self.gateway.retrieve_session(session_id).await.map_err(|e| {
            error!("Failed to retrieve session {}: {}", session_id, e);
            ReconciliationOutcome::Failed(e.to_string())
        })
    }

    /// Multi-strategy email discovery, in strict priority order.
    async fn discover_email(&self, session: &SessionDetail) -> Option<String> {
        if let Some(email) = EMAIL_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(session))
        {
            return Some(email);
        }

        // Last resort: the processor's persistent customer record
        let customer_ref = session.customer_ref.as_deref()?;
        match self.gateway.retrieve_customer(customer_ref).await {
            Ok(customer) => non_empty(customer.email),
            Err(e) => {
                warn!("Failed to retrieve customer {}: {}", customer_ref, e);
                None
            }
        }
    }

    /// Detached customer search/update/create so the backend ends up with
    /// a durable record carrying the right consent and recovery tag.
    fn spawn_customer_upsert(&self, draft: &DraftOrderPayload) {
        let backend = Arc::clone(&self.backend);
        let upsert = CustomerUpsert {
            email: draft.email.clone(),
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            accepts_marketing: draft.accepts_marketing,
            tags: "abandoned-checkout".to_string(),
        };

        tokio::spawn(async move {
            let result = match backend.find_customer_by_email(&upsert.email).await {
                Ok(Some(existing)) => backend
                    .update_customer(existing.id, &upsert)
                    .await
                    .map(|_| ()),
                Ok(None) => backend.create_customer(&upsert).await.map(|_| ()),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!("Customer upsert failed for {}: {}", upsert.email, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockBackend, MockGateway};
    use bridge_core::{Address, CustomerDetails, CustomerRecord, ShippingDetails};
    use chrono::Utc;
    use std::time::Duration;

    fn event(kind: LifecycleEventKind) -> LifecycleEvent {
        LifecycleEvent {
            id: "evt_1".to_string(),
            kind,
            session_id: Some("cs_test_123".to_string()),
            created_at: Utc::now(),
        }
    }

    fn completed_session() -> SessionDetail {
        let mut session = SessionDetail::default();
        session.id = "cs_test_123".into();
        session.payment_status = "paid".into();
        session.currency = "USD".into();
        session.amount_total_minor = 21650;
        session.payment_reference = Some("pi_abc".into());
        session.customer_details = Some(CustomerDetails {
            email: Some("buyer@example.com".into()),
            name: Some("Aisha Al Amiri".into()),
            phone: None,
            address: None,
        });
        session.shipping_details = Some(ShippingDetails {
            name: None,
            address: Some(Address {
                line1: Some("1 Marina Walk".into()),
                city: Some("Dubai".into()),
                country: Some("AE".into()),
                ..Default::default()
            }),
        });
        session.metadata.insert(
            "cart_items_json".into(),
            "[{\"variantId\":42,\"quantity\":2,\"price\":10000}]".into(),
        );
        session.metadata.insert("currency".into(), "USD".into());
        session
    }

    fn reconciler(gateway: MockGateway, backend: &Arc<MockBackend>) -> Reconciler {
        Reconciler::new(Arc::new(gateway), Arc::clone(backend) as _, None)
    }

    #[tokio::test]
    async fn test_completed_creates_order() {
        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(completed_session()), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionCompleted))
            .await;

        assert!(matches!(outcome, ReconciliationOutcome::OrderCreated(_)));

        let orders = backend.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].email, "buyer@example.com");
        assert_eq!(orders[0].payment_reference, "pi_abc");
        assert_eq!(orders[0].items[0].variant_id, 42);
    }

    #[tokio::test]
    async fn test_completed_without_cart_metadata_skips() {
        let mut session = completed_session();
        session.metadata.remove("cart_items_json");

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionCompleted))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped(SkipReason::MissingCartData)
        ));
        assert!(backend.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_without_address_skips() {
        let mut session = completed_session();
        session.shipping_details = None;

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionCompleted))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped(SkipReason::MissingAddress)
        ));
        assert!(backend.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_backend_failure_is_swallowed() {
        let backend = Arc::new(MockBackend::failing());
        let engine = reconciler(MockGateway::with_session(completed_session()), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionCompleted))
            .await;

        assert!(matches!(outcome, ReconciliationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_retrieve_failure_is_swallowed() {
        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::failing_retrieve(), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionCompleted))
            .await;

        assert!(matches!(outcome, ReconciliationOutcome::Failed(_)));
        assert!(backend.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_event_is_noop() {
        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(completed_session()), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::Other("charge.refunded".into())))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped(SkipReason::UnhandledEvent)
        ));
        assert!(backend.orders.lock().unwrap().is_empty());
        assert!(backend.drafts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_creates_draft_with_metadata_email_priority() {
        let mut session = completed_session();
        session
            .metadata
            .insert("customer_email".into(), "precaptured@example.com".into());

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::DraftOrderCreated(_)
        ));

        let drafts = backend.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        // Pre-captured metadata email outranks the customer-details email
        assert_eq!(drafts[0].email, "precaptured@example.com");
        assert_eq!(drafts[0].session_id, "cs_test_123");
    }

    #[tokio::test]
    async fn test_expired_empty_metadata_email_falls_through() {
        let mut session = completed_session();
        session.metadata.insert("customer_email".into(), "".into());

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        let drafts = backend.drafts.lock().unwrap();
        assert_eq!(drafts[0].email, "buyer@example.com");
    }

    #[tokio::test]
    async fn test_expired_uses_session_fallback_email() {
        let mut session = completed_session();
        session.customer_details = None;
        session.shipping_details = None;
        session.customer_email = Some("fallback@example.com".into());

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::DraftOrderCreated(_)
        ));
        assert_eq!(backend.drafts.lock().unwrap()[0].email, "fallback@example.com");
    }

    #[tokio::test]
    async fn test_expired_falls_back_to_customer_record() {
        let mut session = completed_session();
        session.customer_details = None;
        session.customer_ref = Some("cus_789".into());

        let gateway = MockGateway::with_session(session).with_customer(CustomerRecord {
            id: "cus_789".into(),
            email: Some("linked@example.com".into()),
            name: None,
            phone: None,
        });

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(gateway, &backend);

        engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert_eq!(backend.drafts.lock().unwrap()[0].email, "linked@example.com");
    }

    #[tokio::test]
    async fn test_expired_without_any_email_skips() {
        let mut session = completed_session();
        session.customer_details = None;
        session.customer_email = None;
        session.customer_ref = None;

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped(SkipReason::NoEmail)
        ));
        assert!(backend.drafts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_without_cart_items_skips() {
        let mut session = completed_session();
        session
            .metadata
            .insert("cart_items_json".into(), "[]".into());

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped(SkipReason::MissingCartData)
        ));
    }

    #[tokio::test]
    async fn test_expired_upserts_customer_consent() {
        let mut session = completed_session();
        session
            .metadata
            .insert("marketing_consent".into(), "true".into());

        let backend = Arc::new(MockBackend::default());
        let engine = reconciler(MockGateway::with_session(session), &backend);

        engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        // The upsert runs on a detached task; give it a moment
        tokio::time::sleep(Duration::from_millis(50)).await;

        let created = backend.customers_created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].email, "buyer@example.com");
        assert!(created[0].accepts_marketing);
        assert_eq!(created[0].tags, "abandoned-checkout");
    }

    #[tokio::test]
    async fn test_expired_updates_existing_customer() {
        let backend = Arc::new(MockBackend::default().with_existing_customer(555));
        let engine = reconciler(MockGateway::with_session(completed_session()), &backend);

        engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        let updated = backend.customers_updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, 555);
        assert!(backend.customers_created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_draft_failure_does_not_panic() {
        let backend = Arc::new(MockBackend::failing());
        let engine = reconciler(MockGateway::with_session(completed_session()), &backend);

        let outcome = engine
            .handle_event(&event(LifecycleEventKind::SessionExpired))
            .await;

        assert!(matches!(outcome, ReconciliationOutcome::Failed(_)));
    }
}
