//! Loan route definitions

use axum::{routing::get, Router};

use crate::handlers::{create_loan, get_loan, list_loans, manage_loans};
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans))
        .route("/loans", axum::routing::post(create_loan))
        .route("/loans/:id", get(get_loan))
        .route("/manage-loans/:email", get(manage_loans))
}
