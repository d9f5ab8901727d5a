//! Payment route definitions

use axum::Router;

use crate::handlers::{create_checkout_session, payment_paid};
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-checkout-session",
            axum::routing::post(create_checkout_session),
        )
        .route("/payment-paid", axum::routing::post(payment_paid))
}
