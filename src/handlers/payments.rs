//! Checkout and reconciliation handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::models::{ApiResponse, CreateCheckoutRequest, ReconcileRequest};
use crate::payments::{CheckoutSessionUrl, PaymentService, ReconcileOutcome};

/// Create a gateway checkout session for the application fee
pub async fn create_checkout_session(
    State(payments): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> ApiResult<Json<ApiResponse<CheckoutSessionUrl>>> {
    request.validate()?;

    let url = payments
        .create_checkout(&user.identity(), request)
        .await?;

    Ok(Json(ApiResponse::ok(url)))
}

/// Reconcile a checkout session into a payment record. The tagged outcome
/// makes replays and anomalies visible to the caller.
pub async fn payment_paid(
    State(payments): State<Arc<PaymentService>>,
    Json(request): Json<ReconcileRequest>,
) -> ApiResult<Json<ApiResponse<ReconcileOutcome>>> {
    let outcome = payments.reconcile(&request.session_id).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
