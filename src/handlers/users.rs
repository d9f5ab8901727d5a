//! User record handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, RoleResponse, UpdateRoleRequest, UpsertUserRequest, User};
use crate::store::MarketStore;

/// Login bookkeeping: first sight of an email creates the record (role
/// defaulted to borrower), later calls only advance the login time.
pub async fn upsert_user(
    State(store): State<Arc<dyn MarketStore>>,
    Json(request): Json<UpsertUserRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    request.validate()?;

    let user = store
        .upsert_login(User::new(
            request.email,
            request.name,
            request.role,
            request.status,
        ))
        .await?;

    Ok(Json(ApiResponse::ok(user)))
}

/// Fetch the caller's role
pub async fn get_user_role(
    State(store): State<Arc<dyn MarketStore>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<RoleResponse>>> {
    let record = store
        .find_user(&user.email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no user record for {}", user.email)))?;

    Ok(Json(ApiResponse::ok(RoleResponse { role: record.role })))
}

/// List every user except the calling admin
pub async fn list_all_users(
    State(store): State<Arc<dyn MarketStore>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = store.list_users_except(&admin.email).await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// Set a user's role
pub async fn update_role(
    State(store): State<Arc<dyn MarketStore>>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<Json<ApiResponse<RoleResponse>>> {
    request.validate()?;

    let updated = store.set_user_role(&request.email, request.role).await?;
    if !updated {
        return Err(ApiError::NotFound(format!(
            "no user record for {}",
            request.email
        )));
    }

    Ok(Json(ApiResponse::ok(RoleResponse { role: request.role })))
}
