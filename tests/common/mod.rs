//! Shared helpers for integration tests: a deterministic identity verifier,
//! a scripted payment gateway, and a router wired to the in-memory store.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use tower::util::ServiceExt;

use loanlink_server::auth::{AuthError, IdentityVerifier, VerifiedIdentity};
use loanlink_server::payments::{
    CheckoutSession, CheckoutSessionRequest, CreatedSession, GatewayError, PaymentGateway,
    PaymentService, SessionMetadata,
};
use loanlink_server::routes::build_router;
use loanlink_server::state::AppState;
use loanlink_server::store::{InMemoryStore, MarketStore};

/// Verifier that resolves a fixed token table and counts invocations, so
/// tests can assert it is never consulted for tokenless requests.
#[derive(Default)]
pub struct StaticVerifier {
    identities: HashMap<String, VerifiedIdentity>,
    calls: AtomicUsize,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, token: &str, email: &str, name: Option<&str>) -> Self {
        self.identities.insert(
            token.to_string(),
            VerifiedIdentity {
                email: email.to_string(),
                name: name.map(|n| n.to_string()),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown test token".to_string()))
    }
}

/// Gateway with scripted sessions; records every create request it sees.
#[derive(Default)]
pub struct MockGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    created: Mutex<Vec<CheckoutSessionRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_session(&self, session: CheckoutSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn created_requests(&self) -> Vec<CheckoutSessionRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedSession, GatewayError> {
        self.created.lock().unwrap().push(request);
        Ok(CreatedSession {
            id: "cs_test_1".to_string(),
            url: "https://checkout.test/pay/cs_test_1".to_string(),
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(GatewayError::Api {
                status: 404,
                body: "No such checkout session".to_string(),
            })
    }
}

/// Session builder for reconciliation scenarios
pub fn session(
    id: &str,
    payment_status: &str,
    payment_intent: Option<&str>,
    application_id: &str,
    borrower: &str,
) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        payment_status: payment_status.to_string(),
        payment_intent: payment_intent.map(|p| p.to_string()),
        amount_total: Some(1000),
        metadata: SessionMetadata {
            loan_id: application_id.to_string(),
            borrower: borrower.to_string(),
            loan_title: "Small business".to_string(),
            category: "business".to_string(),
            loan_amount: "5000".to_string(),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub verifier: Arc<StaticVerifier>,
    pub gateway: Arc<MockGateway>,
}

/// Wire a full router against the in-memory store, the given verifier, and
/// a fresh mock gateway.
pub fn test_app(verifier: StaticVerifier) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let verifier = Arc::new(verifier);
    let gateway = Arc::new(MockGateway::new());

    let store_handle: Arc<dyn MarketStore> = store.clone();
    let gateway_handle: Arc<dyn PaymentGateway> = gateway.clone();

    let payments = Arc::new(PaymentService::new(
        store_handle.clone(),
        gateway_handle,
        "http://localhost:5173".to_string(),
    ));

    let state = AppState::new(store_handle, verifier.clone(), payments);

    TestApp {
        router: build_router(state),
        store,
        verifier,
        gateway,
    }
}

/// Fire one request at the router
pub async fn send(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
