//! Document store access for LoanLink
//!
//! The [`MarketStore`] trait is the seam between the route layer and the
//! backing document database: four logical collections (loans, applications,
//! payments, users) with the handful of queries the handlers need. The
//! production implementation is [`MongoStore`]; [`InMemoryStore`] backs the
//! test suite.

use axum::async_trait;
use thiserror::Error;

use crate::models::{Loan, LoanApplication, Payment, User, UserRole};

mod memory;
mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// Store-level errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A payment for this transaction id is already recorded. Raised by the
    /// storage layer's uniqueness guarantee, so concurrent check-then-insert
    /// races collapse to a single record.
    #[error("payment for transaction {0} already exists")]
    DuplicateTransaction(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Typed access to the marketplace collections
#[async_trait]
pub trait MarketStore: Send + Sync {
    // Loans
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError>;
    async fn list_loans(&self) -> Result<Vec<Loan>, StoreError>;
    async fn find_loan(&self, id: &str) -> Result<Option<Loan>, StoreError>;
    async fn loans_by_creator(&self, email: &str) -> Result<Vec<Loan>, StoreError>;

    // Loan applications
    async fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, StoreError>;
    async fn find_application(&self, id: &str) -> Result<Option<LoanApplication>, StoreError>;
    async fn applications_by_borrower(
        &self,
        email: &str,
    ) -> Result<Vec<LoanApplication>, StoreError>;

    // Payments
    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// Insert a payment, enforcing at most one record per transaction id.
    /// A second insert with the same transaction id fails with
    /// [`StoreError::DuplicateTransaction`].
    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError>;

    // Users
    /// Insert-or-touch on login: a new email creates the record as given,
    /// an existing email only advances `last_loggedIn`. Returns the
    /// persisted record.
    async fn upsert_login(&self, user: User) -> Result<User, StoreError>;
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users_except(&self, email: &str) -> Result<Vec<User>, StoreError>;
    /// Set exactly the targeted user's role. Returns false when no record
    /// matches the email.
    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool, StoreError>;

    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
}
