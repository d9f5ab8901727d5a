//! User route definitions

use axum::{routing::get, Router};

use crate::handlers::{get_user_role, list_all_users, update_role, upsert_user};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", axum::routing::post(upsert_user))
        .route("/user/role", get(get_user_role))
        .route("/all-user", get(list_all_users))
        .route("/update-role", axum::routing::patch(update_role))
}
