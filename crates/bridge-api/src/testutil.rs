//! Hand-rolled collaborator mocks shared by the reconciler and handler
//! tests. Compiled only for tests.

use async_trait::async_trait;
use bridge_core::{
    BackendCustomer, BackendOrderRef, BridgeError, BridgeResult, CreatedSession, CustomerRecord,
    CustomerUpsert, DraftOrderPayload, LifecycleEvent, OrderBackend, OrderPayload, PaymentGateway,
    SessionDetail, SessionRequest,
};
use std::sync::Mutex;

/// Scriptable payment gateway
#[derive(Default)]
pub struct MockGateway {
    pub session: Option<SessionDetail>,
    pub customer: Option<CustomerRecord>,
    pub created: Option<CreatedSession>,
    pub verified_event: Option<LifecycleEvent>,
    pub fail_retrieve: bool,
}

impl MockGateway {
    pub fn with_session(session: SessionDetail) -> Self {
        Self {
            session: Some(session),
            ..Default::default()
        }
    }

    pub fn failing_retrieve() -> Self {
        Self {
            fail_retrieve: true,
            ..Default::default()
        }
    }

    pub fn with_customer(mut self, customer: CustomerRecord) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_created(mut self, created: CreatedSession) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_verified_event(mut self, event: LifecycleEvent) -> Self {
        self.verified_event = Some(event);
        self
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_session(
        &self,
        _request: &SessionRequest,
        _success_url: &str,
        _cancel_url: &str,
    ) -> BridgeResult<CreatedSession> {
        self.created.clone().ok_or(BridgeError::BackendCall {
            service: "stripe".to_string(),
            message: "mock not scripted for create_session".to_string(),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> BridgeResult<SessionDetail> {
        if self.fail_retrieve {
            return Err(BridgeError::Network("connection refused".to_string()));
        }
        self.session
            .clone()
            .ok_or_else(|| BridgeError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    async fn retrieve_customer(&self, customer_ref: &str) -> BridgeResult<CustomerRecord> {
        self.customer.clone().ok_or(BridgeError::BackendCall {
            service: "stripe".to_string(),
            message: format!("no customer {}", customer_ref),
        })
    }

    fn verify_event(&self, _payload: &[u8], _signature: &str) -> BridgeResult<LifecycleEvent> {
        self.verified_event
            .clone()
            .ok_or_else(|| BridgeError::SignatureInvalid("Signature mismatch".to_string()))
    }
}

/// Recording order backend
#[derive(Default)]
pub struct MockBackend {
    pub orders: Mutex<Vec<OrderPayload>>,
    pub drafts: Mutex<Vec<DraftOrderPayload>>,
    pub customers_created: Mutex<Vec<CustomerUpsert>>,
    pub customers_updated: Mutex<Vec<(i64, CustomerUpsert)>>,
    pub existing_customer_id: Option<i64>,
    pub fail: bool,
}

impl MockBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_existing_customer(mut self, id: i64) -> Self {
        self.existing_customer_id = Some(id);
        self
    }

    fn check(&self) -> BridgeResult<()> {
        if self.fail {
            Err(BridgeError::BackendCall {
                service: "shopify".to_string(),
                message: "mock failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderBackend for MockBackend {
    async fn create_order(&self, order: &OrderPayload) -> BridgeResult<BackendOrderRef> {
        self.check()?;
        self.orders.lock().unwrap().push(order.clone());
        Ok(BackendOrderRef {
            id: Some(9001),
            order_number: Some(1234),
        })
    }

    async fn create_draft_order(&self, draft: &DraftOrderPayload) -> BridgeResult<BackendOrderRef> {
        self.check()?;
        self.drafts.lock().unwrap().push(draft.clone());
        Ok(BackendOrderRef {
            id: Some(7007),
            order_number: None,
        })
    }

    async fn find_customer_by_email(&self, email: &str) -> BridgeResult<Option<BackendCustomer>> {
        self.check()?;
        Ok(self.existing_customer_id.map(|id| BackendCustomer {
            id,
            email: email.to_string(),
        }))
    }

    async fn create_customer(&self, customer: &CustomerUpsert) -> BridgeResult<BackendCustomer> {
        self.check()?;
        self.customers_created.lock().unwrap().push(customer.clone());
        Ok(BackendCustomer {
            id: 555,
            email: customer.email.clone(),
        })
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        customer: &CustomerUpsert,
    ) -> BridgeResult<BackendCustomer> {
        self.check()?;
        self.customers_updated
            .lock()
            .unwrap()
            .push((customer_id, customer.clone()));
        Ok(BackendCustomer {
            id: customer_id,
            email: customer.email.clone(),
        })
    }
}
