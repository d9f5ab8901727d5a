//! Application state shared across handlers
//!
//! The collaborator handles are constructed once at startup and injected
//! into the router; handlers and extractors pull them back out via
//! [`FromRef`].

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::IdentityVerifier;
use crate::payments::PaymentService;
use crate::store::MarketStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MarketStore>,
        verifier: Arc<dyn IdentityVerifier>,
        payments: Arc<PaymentService>,
    ) -> Self {
        Self {
            store,
            verifier,
            payments,
        }
    }
}

impl FromRef<AppState> for Arc<dyn MarketStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<dyn IdentityVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payments.clone()
    }
}
