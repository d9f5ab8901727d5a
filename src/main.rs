//! LoanLink Backend Server
//!
//! HTTP backend for the LoanLink peer-lending marketplace: loan offers,
//! borrower applications, checkout-fee payments, and user role management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tower_http::cors::CorsLayer;

use loanlink_server::auth::FirebaseVerifier;
use loanlink_server::config::Config;
use loanlink_server::payments::{PaymentService, StripeGateway};
use loanlink_server::routes::build_router;
use loanlink_server::state::AppState;
use loanlink_server::store::{MarketStore, MongoStore};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    // Connect to the document store (pings and creates indexes)
    let store = match MongoStore::connect(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to connect to document store: {}", e);
            std::process::exit(1);
        }
    };
    let store: Arc<dyn MarketStore> = Arc::new(store);

    // Construct the collaborator handles once and inject them
    let verifier = Arc::new(FirebaseVerifier::new(
        config.service_account.project_id.clone(),
    ));
    let gateway = Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));
    let payments = Arc::new(PaymentService::new(
        store.clone(),
        gateway,
        config.client_domain.clone(),
    ));

    let app_state = AppState::new(store, verifier, payments);

    let app = build_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

fn configure_cors(config: &Config) -> CorsLayer {
    let origin: Option<HeaderValue> = config.client_domain.parse().ok();

    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => {
            tracing::warn!("CLIENT_DOMAIN is not a valid origin, allowing all (permissive)");
            CorsLayer::permissive()
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
