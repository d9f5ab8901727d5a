//! Loan application handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::models::{ApiResponse, ApplyLoanRequest, LoanApplication};
use crate::store::MarketStore;

/// Record a borrower's application against a loan offer. The borrower
/// identity comes from the verified token.
pub async fn apply_for_loan(
    State(store): State<Arc<dyn MarketStore>>,
    user: AuthenticatedUser,
    Json(request): Json<ApplyLoanRequest>,
) -> ApiResult<Json<ApiResponse<LoanApplication>>> {
    request.validate()?;

    let application = LoanApplication::new(
        request,
        user.email.clone(),
        user.name.clone().unwrap_or_default(),
    );

    let application = store.insert_application(application).await?;

    Ok(Json(ApiResponse::ok(application)))
}

/// List the caller's own applications
pub async fn my_loans(
    State(store): State<Arc<dyn MarketStore>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<LoanApplication>>>> {
    let applications = store.applications_by_borrower(&user.email).await?;
    Ok(Json(ApiResponse::ok(applications)))
}

/// List applications by borrower email
pub async fn pending_applications(
    State(store): State<Arc<dyn MarketStore>>,
    Path(email): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<LoanApplication>>>> {
    let applications = store.applications_by_borrower(&email).await?;
    Ok(Json(ApiResponse::ok(applications)))
}
