//! Authentication and role extractors
//!
//! [`AuthenticatedUser`] maps a bearer token to a verified identity.
//! [`ManagerUser`] and [`AdminUser`] layer role authorization on top by
//! looking up the caller's stored role; a role mismatch is a 403, distinct
//! from the 401 an unauthenticated caller gets.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::auth::IdentityVerifier;
use crate::error::ApiError;
use crate::models::UserRole;
use crate::store::MarketStore;

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub email: String,
    pub name: Option<String>,
}

impl AuthenticatedUser {
    pub fn identity(&self) -> crate::auth::VerifiedIdentity {
        crate::auth::VerifiedIdentity {
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A missing or malformed header fails here, before the verifier is
        // ever consulted.
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let verifier = Arc::<dyn IdentityVerifier>::from_ref(state);

        let identity = verifier.verify(bearer.token()).await.map_err(|err| {
            tracing::debug!(error = %err, "Token verification failed");
            ApiError::Unauthorized("invalid or expired token".to_string())
        })?;

        Ok(AuthenticatedUser {
            email: identity.email,
            name: identity.name,
        })
    }
}

async fn require_role<S>(
    parts: &mut Parts,
    state: &S,
    role: UserRole,
) -> Result<AuthenticatedUser, ApiError>
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    Arc<dyn MarketStore>: FromRef<S>,
    S: Send + Sync,
{
    let user = AuthenticatedUser::from_request_parts(parts, state).await?;

    let store = Arc::<dyn MarketStore>::from_ref(state);
    let record = store
        .find_user(&user.email)
        .await?
        .ok_or_else(|| ApiError::Forbidden(format!("{} access required", role.as_str())))?;

    if record.role != role {
        return Err(ApiError::Forbidden(format!(
            "{} access required",
            role.as_str()
        )));
    }

    Ok(user)
}

/// Extractor requiring the caller's stored role to be manager
pub struct ManagerUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for ManagerUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    Arc<dyn MarketStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(ManagerUser(
            require_role(parts, state, UserRole::Manager).await?,
        ))
    }
}

/// Extractor requiring the caller's stored role to be admin
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    Arc<dyn MarketStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(AdminUser(
            require_role(parts, state, UserRole::Admin).await?,
        ))
    }
}
