//! Loan application route definitions

use axum::{routing::get, Router};

use crate::handlers::{apply_for_loan, my_loans, pending_applications};
use crate::state::AppState;

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/borrowerLoansApply",
            axum::routing::post(apply_for_loan),
        )
        .route("/my-loans", get(my_loans))
        .route("/pending-applications/:email", get(pending_applications))
}
