//! Router-level tests: authentication ordering, role gates, user upsert
//! semantics, and the payment endpoints end to end.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use loanlink_server::models::{User, UserRole};
use loanlink_server::store::MarketStore;

use common::{body_json, send, session, test_app, StaticVerifier};

fn verifier() -> StaticVerifier {
    StaticVerifier::new()
        .with_identity("tok-borrower", "b@x.com", Some("Bea Borrower"))
        .with_identity("tok-manager", "m@x.com", Some("Mia Manager"))
        .with_identity("tok-admin", "a@x.com", Some("Ada Admin"))
}

/// Seed role records the extractors look up
async fn seed_roles(app: &common::TestApp) {
    for (email, role) in [
        ("b@x.com", UserRole::Borrower),
        ("m@x.com", UserRole::Manager),
        ("a@x.com", UserRole::Admin),
    ] {
        app.store
            .upsert_login(User::new(email.to_string(), None, Some(role), None))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_missing_token_is_rejected_before_verification() {
    let app = test_app(verifier());

    let response = send(&app.router, "GET", "/my-loans", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // The verifier must never have been consulted.
    assert_eq!(app.verifier.calls(), 0);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let app = test_app(verifier());

    let response = send(&app.router, "GET", "/my-loans", Some("tok-bogus"), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.verifier.calls(), 1);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_my_loans_lists_only_the_callers_applications() {
    let app = test_app(verifier());

    let apply = |email: &str, token: &str| {
        let body = json!({
            "loanId": "L1",
            "loanTitle": "Small business",
            "category": "business",
            "loanAmount": 5000
        });
        let token = token.to_string();
        let email = email.to_string();
        let router = app.router.clone();
        async move {
            let response = send(&router, "POST", "/borrowerLoansApply", Some(&token), Some(body)).await;
            assert_eq!(response.status(), StatusCode::OK, "apply failed for {}", email);
        }
    };

    apply("b@x.com", "tok-borrower").await;
    apply("m@x.com", "tok-manager").await;

    let response = send(&app.router, "GET", "/my-loans", Some("tok-borrower"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let applications = body["data"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["borrowerEmail"], json!("b@x.com"));
}

#[tokio::test]
async fn test_loan_creation_requires_manager_role() {
    let app = test_app(verifier());
    seed_roles(&app).await;

    let body = json!({
        "title": "Working capital",
        "category": "business",
        "loanAmount": 12000
    });

    let response = send(&app.router, "POST", "/loans", Some("tok-borrower"), Some(body.clone())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app.router, "POST", "/loans", Some("tok-manager"), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["data"]["createdBy"]["email"], json!("m@x.com"));
    assert!(created["data"]["createdAt"].is_string());

    // The offer is publicly listable.
    let response = send(&app.router, "GET", "/loans", None, None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_loan_returns_not_found_for_unknown_id() {
    let app = test_app(verifier());

    let response = send(&app.router, "GET", "/loans/nope", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn test_manage_loans_is_scoped_to_the_callers_email() {
    let app = test_app(verifier());
    seed_roles(&app).await;

    let response = send(
        &app.router,
        "GET",
        "/manage-loans/other@x.com",
        Some("tok-manager"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app.router,
        "GET",
        "/manage-loans/m@x.com",
        Some("tok-manager"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_all_user_requires_admin_and_excludes_caller() {
    let app = test_app(verifier());
    seed_roles(&app).await;

    let response = send(&app.router, "GET", "/all-user", Some("tok-borrower"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app.router, "GET", "/all-user", Some("tok-admin"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["email"] != json!("a@x.com")));
}

#[tokio::test]
async fn test_update_role_targets_exactly_one_user() {
    let app = test_app(verifier());
    seed_roles(&app).await;

    let body = json!({ "email": "b@x.com", "role": "manager" });
    let response = send(&app.router, "PATCH", "/update-role", Some("tok-admin"), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let target = app.store.find_user("b@x.com").await.unwrap().unwrap();
    assert_eq!(target.role, UserRole::Manager);

    // Everyone else keeps their role.
    let other = app.store.find_user("m@x.com").await.unwrap().unwrap();
    assert_eq!(other.role, UserRole::Manager);
    let admin = app.store.find_user("a@x.com").await.unwrap().unwrap();
    assert_eq!(admin.role, UserRole::Admin);

    // Unknown target is a 404, and non-admins are forbidden.
    let body = json!({ "email": "ghost@x.com", "role": "admin" });
    let response = send(&app.router, "PATCH", "/update-role", Some("tok-admin"), Some(body)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json!({ "email": "b@x.com", "role": "admin" });
    let response = send(&app.router, "PATCH", "/update-role", Some("tok-borrower"), Some(body)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_upsert_defaults_role_and_touches_only_login_time() {
    let app = test_app(verifier());

    let body = json!({ "email": "new@x.com", "name": "Newcomer" });
    let response = send(&app.router, "POST", "/user", None, Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let first = body_json(response).await;
    assert_eq!(first["data"]["role"], json!("borrower"));
    let created_at = first["data"]["created_at"].clone();

    // A second login supplying a different role and name must only advance
    // the login time.
    let body = json!({ "email": "new@x.com", "name": "Impostor", "role": "admin" });
    let response = send(&app.router, "POST", "/user", None, Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let second = body_json(response).await;
    assert_eq!(second["data"]["role"], json!("borrower"));
    assert_eq!(second["data"]["name"], json!("Newcomer"));
    assert_eq!(second["data"]["created_at"], created_at);

    let first_login = chrono::DateTime::parse_from_rfc3339(
        first["data"]["last_loggedIn"].as_str().unwrap(),
    )
    .unwrap();
    let second_login = chrono::DateTime::parse_from_rfc3339(
        second["data"]["last_loggedIn"].as_str().unwrap(),
    )
    .unwrap();
    assert!(second_login >= first_login);
}

#[tokio::test]
async fn test_user_role_lookup() {
    let app = test_app(verifier());
    seed_roles(&app).await;

    let response = send(&app.router, "GET", "/user/role", Some("tok-manager"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], json!("manager"));

    // Verified identity without a stored record
    let app = test_app(verifier());
    let response = send(&app.router, "GET", "/user/role", Some("tok-manager"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_session_carries_fee_and_metadata() {
    let app = test_app(verifier());

    let body = json!({
        "loanId": "A1",
        "title": "Small business",
        "category": "business",
        "loanAmount": 5000
    });

    // Checkout requires a verified identity.
    let response = send(&app.router, "POST", "/create-checkout-session", None, Some(body.clone())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app.router,
        "POST",
        "/create-checkout-session",
        Some("tok-borrower"),
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["url"], json!("https://checkout.test/pay/cs_test_1"));

    let created = app.gateway.created_requests();
    assert_eq!(created.len(), 1);
    // Flat application fee, not the loan amount
    assert_eq!(created[0].unit_amount, 1000);
    assert_eq!(created[0].customer_email, "b@x.com");
    assert_eq!(created[0].metadata.loan_id, "A1");
    assert_eq!(created[0].metadata.loan_amount, "5000");
    assert!(created[0].success_url.contains("{CHECKOUT_SESSION_ID}"));
}

#[tokio::test]
async fn test_payment_paid_endpoint_reports_tagged_outcomes() {
    let app = test_app(verifier());

    // Seed an application and a paid session for it.
    let apply_body = json!({
        "loanId": "L1",
        "loanTitle": "Small business",
        "category": "business",
        "loanAmount": 5000
    });
    let response = send(
        &app.router,
        "POST",
        "/borrowerLoansApply",
        Some("tok-borrower"),
        Some(apply_body),
    )
    .await;
    let application = body_json(response).await;
    let application_id = application["data"]["_id"].as_str().unwrap().to_string();

    app.gateway.insert_session(session(
        "cs_123",
        "paid",
        Some("pi_999"),
        &application_id,
        "b@x.com",
    ));

    let body = json!({ "sessionId": "cs_123" });
    let response = send(&app.router, "POST", "/payment-paid", None, Some(body.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["data"]["outcome"], json!("reconciled"));
    assert_eq!(first["data"]["payment"]["transactionId"], json!("pi_999"));

    // Replay: the outcome is explicit, and nothing is double-recorded.
    let response = send(&app.router, "POST", "/payment-paid", None, Some(body)).await;
    let second = body_json(response).await;
    assert_eq!(second["data"]["outcome"], json!("already_recorded"));
}

#[tokio::test]
async fn test_pending_applications_is_public() {
    let app = test_app(verifier());

    let response = send(
        &app.router,
        "GET",
        "/pending-applications/b@x.com",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_health_endpoint_reports_store_status() {
    let app = test_app(verifier());

    let response = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["database"], json!("connected"));
}
