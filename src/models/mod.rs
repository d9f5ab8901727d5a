//! Data models for the LoanLink marketplace
//!
//! Documents are stored with camelCase field names so the wire JSON and the
//! persisted records share one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role assigned to a user record the first time an email is seen,
/// unless the caller supplies one explicitly.
pub const DEFAULT_ROLE: UserRole = UserRole::Borrower;

/// User roles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Borrower,
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Borrower => "borrower",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }
}

/// The manager who posted a loan offer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBy {
    pub email: String,
    pub name: String,
}

/// A loan offer posted by a manager. Immutable once created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub category: String,
    pub loan_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: CreatedBy,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Build a new offer. The id and creation time are assigned server-side.
    pub fn new(request: CreateLoanRequest, created_by: CreatedBy) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            category: request.category,
            loan_amount: request.loan_amount,
            description: request.description,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Request body for posting a loan offer
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "category must not be empty"))]
    pub category: String,
    #[validate(range(min = 1, message = "loanAmount must be positive"))]
    pub loan_amount: i64,
    pub description: Option<String>,
}

/// A borrower's application against a loan offer.
///
/// References a Loan by id but does not own it; the application may outlive
/// the offer it was made against.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    #[serde(rename = "_id")]
    pub id: String,
    pub loan_id: String,
    pub borrower_email: String,
    pub borrower_name: String,
    pub loan_title: String,
    pub category: String,
    pub loan_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl LoanApplication {
    pub fn new(request: ApplyLoanRequest, borrower_email: String, borrower_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            loan_id: request.loan_id,
            borrower_email,
            borrower_name,
            loan_title: request.loan_title,
            category: request.category,
            loan_amount: request.loan_amount,
            created_at: Utc::now(),
        }
    }
}

/// Request body for a borrower's application
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLoanRequest {
    #[validate(length(min = 1, message = "loanId must not be empty"))]
    pub loan_id: String,
    #[validate(length(min = 1, message = "loanTitle must not be empty"))]
    pub loan_title: String,
    pub category: String,
    #[validate(range(min = 1, message = "loanAmount must be positive"))]
    pub loan_amount: i64,
}

/// A reconciled, paid checkout. Created exactly once per transaction id and
/// never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    /// The application this payment settles the fee for
    pub loan_id: String,
    /// Gateway-assigned charge id, the idempotency key
    pub transaction_id: String,
    /// Borrower email, copied from session metadata
    pub borrower: String,
    /// Application-level workflow status, distinct from the gateway's
    /// payment status
    pub status: String,
    /// Decimal currency units (gateway minor-unit total divided by 100)
    pub amount: f64,
    pub loan_title: String,
    pub category: String,
    pub loan_amount: i64,
    pub date: DateTime<Utc>,
}

/// Request body for starting a checkout. The borrower identity comes from
/// the verified token, never from the body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[validate(length(min = 1, message = "loanId must not be empty"))]
    pub loan_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub category: String,
    #[validate(range(min = 1, message = "loanAmount must be positive"))]
    pub loan_amount: i64,
}

/// Request body for triggering reconciliation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub session_id: String,
}

/// An identity plus role record. Upserted on login, never hard-deleted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_loggedIn")]
    pub last_logged_in: DateTime<Utc>,
}

impl User {
    /// Construction rule for first-sight records: when the caller supplies
    /// no role, the record gets [`DEFAULT_ROLE`].
    pub fn new(
        email: String,
        name: Option<String>,
        role: Option<UserRole>,
        status: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            email,
            name,
            role: role.unwrap_or(DEFAULT_ROLE),
            status,
            created_at: now,
            last_logged_in: now,
        }
    }
}

/// Request body for the login upsert
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<String>,
}

/// Request body for the admin role patch
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub role: UserRole,
}

/// Response body for the caller's role lookup
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: UserRole,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
