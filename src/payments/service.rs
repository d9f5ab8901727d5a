//! Checkout and reconciliation logic
//!
//! [`PaymentService`] owns the two payment operations: building a hosted
//! checkout session for a borrower, and reconciling a gateway session into
//! an at-most-once payment record.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::VerifiedIdentity;
use crate::models::{CreateCheckoutRequest, Payment};
use crate::store::{MarketStore, StoreError};

use super::{
    CheckoutSessionRequest, CheckoutSessionUrl, GatewayError, PaymentGateway, ReconcileError,
    ReconcileOutcome, SessionMetadata, APPLICATION_FEE_MINOR_UNITS, GATEWAY_PAID_STATUS,
    INITIAL_PAYMENT_STATUS,
};

pub struct PaymentService {
    store: Arc<dyn MarketStore>,
    gateway: Arc<dyn PaymentGateway>,
    client_domain: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        client_domain: String,
    ) -> Self {
        Self {
            store,
            gateway,
            client_domain,
        }
    }

    /// Build a gateway checkout session for the flat application fee.
    ///
    /// No local state is written here; the session exists only in the
    /// gateway until it is reconciled.
    pub async fn create_checkout(
        &self,
        borrower: &VerifiedIdentity,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSessionUrl, GatewayError> {
        let session_request = CheckoutSessionRequest {
            customer_email: borrower.email.clone(),
            product_name: borrower
                .name
                .clone()
                .unwrap_or_else(|| borrower.email.clone()),
            unit_amount: APPLICATION_FEE_MINOR_UNITS,
            success_url: format!(
                "{}/dashboard/my-loans?session_id={{CHECKOUT_SESSION_ID}}",
                self.client_domain
            ),
            cancel_url: format!("{}/dashboard/my-loans", self.client_domain),
            metadata: SessionMetadata {
                loan_id: request.loan_id,
                borrower: borrower.email.clone(),
                loan_title: request.title,
                category: request.category,
                loan_amount: request.loan_amount.to_string(),
            },
        };

        let created = self
            .gateway
            .create_checkout_session(session_request)
            .await?;

        tracing::info!(session = %created.id, "Checkout session created");

        Ok(CheckoutSessionUrl { url: created.url })
    }

    /// Reconcile a checkout session into a payment record.
    ///
    /// Invariant: for a fixed transaction id at most one payment record ever
    /// exists, however many times this is called and however the calls
    /// interleave. The existence check short-circuits replays; the store's
    /// uniqueness guarantee closes the remaining check-then-insert window.
    pub async fn reconcile(&self, session_id: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let session = self.gateway.retrieve_checkout_session(session_id).await?;

        let application = match self.store.find_application(&session.metadata.loan_id).await? {
            Some(application) => application,
            None => {
                tracing::warn!(
                    session = %session.id,
                    application = %session.metadata.loan_id,
                    "Checkout session references a missing loan application"
                );
                return Ok(ReconcileOutcome::ApplicationMissing);
            }
        };

        if let Some(transaction_id) = session.payment_intent.as_deref() {
            if self
                .store
                .find_payment_by_transaction(transaction_id)
                .await?
                .is_some()
            {
                return Ok(ReconcileOutcome::AlreadyRecorded);
            }
        }

        if session.payment_status != GATEWAY_PAID_STATUS {
            return Ok(ReconcileOutcome::NotPaid);
        }

        // A session without a charge attached is not payable yet.
        let transaction_id = match session.payment_intent {
            Some(transaction_id) => transaction_id,
            None => return Ok(ReconcileOutcome::NotPaid),
        };

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            loan_id: session.metadata.loan_id,
            transaction_id,
            borrower: session.metadata.borrower,
            status: INITIAL_PAYMENT_STATUS.to_string(),
            amount: session.amount_total.unwrap_or_default() as f64 / 100.0,
            loan_title: session.metadata.loan_title,
            category: session.metadata.category,
            loan_amount: application.loan_amount,
            date: Utc::now(),
        };

        match self.store.insert_payment(payment).await {
            Ok(payment) => {
                tracing::info!(
                    session = %session.id,
                    transaction = %payment.transaction_id,
                    "Payment reconciled"
                );
                Ok(ReconcileOutcome::Reconciled { payment })
            }
            Err(StoreError::DuplicateTransaction(transaction_id)) => {
                tracing::info!(
                    session = %session.id,
                    transaction = %transaction_id,
                    "Payment already recorded by a concurrent reconciliation"
                );
                Ok(ReconcileOutcome::AlreadyRecorded)
            }
            Err(err) => Err(err.into()),
        }
    }
}
