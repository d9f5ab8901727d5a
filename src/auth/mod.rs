//! Identity verification for LoanLink
//!
//! Bearer tokens are ID tokens minted by the identity provider. The
//! [`IdentityVerifier`] trait is the seam the request extractors call
//! through; [`FirebaseVerifier`] is the production implementation.

use axum::async_trait;
use thiserror::Error;

mod firebase;

pub use firebase::FirebaseVerifier;

/// An email address attested by the identity provider as belonging to the
/// presenter of a bearer token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
}

/// Verification failures. Details are for server-side diagnostics; callers
/// of the HTTP API only ever see a generic unauthorized response.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("signing keys unavailable: {0}")]
    KeyFetch(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer token and extract the identity it attests.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}
