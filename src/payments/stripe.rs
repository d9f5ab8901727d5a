//! Stripe Checkout implementation of [`PaymentGateway`]
//!
//! Talks to the Stripe REST API directly with `reqwest` and form-encoded
//! bodies, the same way the rest of this codebase talks to external HTTP
//! services.

use axum::async_trait;
use serde::Deserialize;

use super::{
    CheckoutSession, CheckoutSessionRequest, CreatedSession, GatewayError, PaymentGateway,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

/// Create-session response; only the fields we hand back are decoded.
#[derive(Debug, Deserialize)]
struct CreatedSessionPayload {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Flatten a session request into Stripe's bracketed form parameters
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        (
            "line_items[0][price_data][currency]".to_string(),
            "usd".to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.unit_amount.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("mode".to_string(), "payment".to_string()),
        (
            "customer_email".to_string(),
            request.customer_email.clone(),
        ),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    params.push((
        "metadata[loanId]".to_string(),
        request.metadata.loan_id.clone(),
    ));
    params.push((
        "metadata[borrower]".to_string(),
        request.metadata.borrower.clone(),
    ));
    params.push((
        "metadata[loanTitle]".to_string(),
        request.metadata.loan_title.clone(),
    ));
    params.push((
        "metadata[category]".to_string(),
        request.metadata.category.clone(),
    ));
    params.push((
        "metadata[loanAmount]".to_string(),
        request.metadata.loan_amount.clone(),
    ));

    params
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedSession, GatewayError> {
        let params = session_form(&request);

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let payload: CreatedSessionPayload = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let url = payload
            .url
            .ok_or_else(|| GatewayError::Decode("created session carries no url".to_string()))?;

        Ok(CreatedSession {
            id: payload.id,
            url,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
