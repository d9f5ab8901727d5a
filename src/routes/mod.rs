//! Route definitions for the LoanLink API

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::state::AppState;
use crate::store::MarketStore;

mod applications;
mod loans;
mod payments;
mod users;

pub use applications::application_routes;
pub use loans::loan_routes;
pub use payments::payment_routes;
pub use users::user_routes;

/// Compose the full request-handling interface from the injected
/// collaborator handles.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(loan_routes())
        .merge(application_routes())
        .merge(payment_routes())
        .merge(user_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracing,
        ))
}

async fn root() -> &'static str {
    "LoanLink API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(State(store): State<Arc<dyn MarketStore>>) -> Json<HealthResponse> {
    let db_status = match store.ping().await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
