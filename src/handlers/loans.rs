//! Loan offer handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ManagerUser;
use crate::models::{ApiResponse, CreateLoanRequest, CreatedBy, Loan};
use crate::store::MarketStore;

/// Post a loan offer. Only managers may create offers; the creator identity
/// comes from the verified token, never from the body.
pub async fn create_loan(
    State(store): State<Arc<dyn MarketStore>>,
    ManagerUser(manager): ManagerUser,
    Json(request): Json<CreateLoanRequest>,
) -> ApiResult<Json<ApiResponse<Loan>>> {
    request.validate()?;

    let created_by = CreatedBy {
        email: manager.email.clone(),
        name: manager.name.clone().unwrap_or_default(),
    };

    let loan = store.insert_loan(Loan::new(request, created_by)).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

/// List all loan offers
pub async fn list_loans(
    State(store): State<Arc<dyn MarketStore>>,
) -> ApiResult<Json<ApiResponse<Vec<Loan>>>> {
    let loans = store.list_loans().await?;
    Ok(Json(ApiResponse::ok(loans)))
}

/// Fetch a single loan offer
pub async fn get_loan(
    State(store): State<Arc<dyn MarketStore>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Loan>>> {
    let loan = store
        .find_loan(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("loan {} not found", id)))?;

    Ok(Json(ApiResponse::ok(loan)))
}

/// List the offers a manager has posted. Managers may only read their own;
/// the path parameter is checked against the verified identity rather than
/// trusted.
pub async fn manage_loans(
    State(store): State<Arc<dyn MarketStore>>,
    ManagerUser(manager): ManagerUser,
    Path(email): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<Loan>>>> {
    if manager.email != email {
        return Err(ApiError::Forbidden(
            "managers may only read their own loans".to_string(),
        ));
    }

    let loans = store.loans_by_creator(&email).await?;
    Ok(Json(ApiResponse::ok(loans)))
}
