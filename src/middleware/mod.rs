//! Middleware for the LoanLink API
//!
//! Request tracing plus the authentication and role extractors.

pub mod auth;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, ManagerUser};
pub use tracing::request_tracing;
