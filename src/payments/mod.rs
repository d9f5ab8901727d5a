//! Payment gateway integration and reconciliation
//!
//! Checkout sessions live entirely in the gateway until the reconciliation
//! engine converts a paid session into a locally owned [`Payment`] record,
//! at most once per transaction id.

use axum::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Payment;
use crate::store::StoreError;

mod service;
mod stripe;

pub use service::PaymentService;
pub use stripe::StripeGateway;

/// Flat application fee charged at checkout, in minor currency units.
/// The loan amount itself is never charged; it rides along as metadata.
pub const APPLICATION_FEE_MINOR_UNITS: i64 = 1000;

/// Workflow status a payment record is created with. The record is never
/// mutated after insert, so this is also its terminal status here.
pub const INITIAL_PAYMENT_STATUS: &str = "pending";

/// The gateway's payment status for a settled session
pub const GATEWAY_PAID_STATUS: &str = "paid";

/// Gateway-level errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

/// Reconciliation failures: either collaborator can be unreachable.
/// Anomalies like a missing application are outcomes, not errors.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identifying metadata attached to a checkout session at creation and read
/// back during reconciliation. Gateway metadata values are strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "loanId", default)]
    pub loan_id: String,
    #[serde(default)]
    pub borrower: String,
    #[serde(rename = "loanTitle", default)]
    pub loan_title: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "loanAmount", default)]
    pub loan_amount: String,
}

/// Everything the gateway needs to build a hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub product_name: String,
    pub unit_amount: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
}

/// A freshly created session: the id names it, the url is where the
/// borrower completes payment.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

/// A session as reported back by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    /// Gateway-assigned charge id; absent until the session has a charge
    pub payment_intent: Option<String>,
    /// Total in minor currency units
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// Response body handed back to the client after session creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSessionUrl {
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedSession, GatewayError>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError>;
}

/// Terminal states of one reconciliation pass. Every branch is explicit so
/// replays and anomalies are observable instead of silent no-ops.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A new payment record was inserted
    Reconciled { payment: Payment },
    /// A payment with this transaction id already exists
    AlreadyRecorded,
    /// The session's metadata references no known loan application
    ApplicationMissing,
    /// The gateway does not report the session as paid
    NotPaid,
}
