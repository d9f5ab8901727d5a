//! In-memory implementation of [`MarketStore`]
//!
//! Backs the test suite and local development without a running database.
//! Payments are keyed by transaction id, so the map itself enforces the same
//! uniqueness the production store gets from its index.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::async_trait;

use crate::models::{Loan, LoanApplication, Payment, User, UserRole};

use super::{MarketStore, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    loans: RwLock<Vec<Loan>>,
    applications: RwLock<Vec<LoanApplication>>,
    /// transaction id -> payment
    payments: RwLock<HashMap<String, Payment>>,
    /// email -> user
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Database("store lock poisoned".to_string())
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError> {
        let mut loans = self.loans.write().map_err(|_| Self::lock_poisoned())?;
        loans.push(loan.clone());
        Ok(loan)
    }

    async fn list_loans(&self) -> Result<Vec<Loan>, StoreError> {
        let loans = self.loans.read().map_err(|_| Self::lock_poisoned())?;
        Ok(loans.clone())
    }

    async fn find_loan(&self, id: &str) -> Result<Option<Loan>, StoreError> {
        let loans = self.loans.read().map_err(|_| Self::lock_poisoned())?;
        Ok(loans.iter().find(|l| l.id == id).cloned())
    }

    async fn loans_by_creator(&self, email: &str) -> Result<Vec<Loan>, StoreError> {
        let loans = self.loans.read().map_err(|_| Self::lock_poisoned())?;
        Ok(loans
            .iter()
            .filter(|l| l.created_by.email == email)
            .cloned()
            .collect())
    }

    async fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, StoreError> {
        let mut applications = self
            .applications
            .write()
            .map_err(|_| Self::lock_poisoned())?;
        applications.push(application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: &str) -> Result<Option<LoanApplication>, StoreError> {
        let applications = self.applications.read().map_err(|_| Self::lock_poisoned())?;
        Ok(applications.iter().find(|a| a.id == id).cloned())
    }

    async fn applications_by_borrower(
        &self,
        email: &str,
    ) -> Result<Vec<LoanApplication>, StoreError> {
        let applications = self.applications.read().map_err(|_| Self::lock_poisoned())?;
        Ok(applications
            .iter()
            .filter(|a| a.borrower_email == email)
            .cloned()
            .collect())
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().map_err(|_| Self::lock_poisoned())?;
        Ok(payments.get(transaction_id).cloned())
    }

    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        let mut payments = self.payments.write().map_err(|_| Self::lock_poisoned())?;
        if payments.contains_key(&payment.transaction_id) {
            return Err(StoreError::DuplicateTransaction(payment.transaction_id));
        }
        payments.insert(payment.transaction_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn upsert_login(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| Self::lock_poisoned())?;
        let entry = users
            .entry(user.email.clone())
            .and_modify(|existing| existing.last_logged_in = user.last_logged_in)
            .or_insert(user);
        Ok(entry.clone())
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| Self::lock_poisoned())?;
        Ok(users.get(email).cloned())
    }

    async fn list_users_except(&self, email: &str) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| Self::lock_poisoned())?;
        Ok(users
            .values()
            .filter(|u| u.email != email)
            .cloned()
            .collect())
    }

    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| Self::lock_poisoned())?;
        match users.get_mut(email) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payment(transaction_id: &str) -> Payment {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            loan_id: "L1".to_string(),
            transaction_id: transaction_id.to_string(),
            borrower: "b@x.com".to_string(),
            status: "pending".to_string(),
            amount: 10.0,
            loan_title: "Small business".to_string(),
            category: "business".to_string(),
            loan_amount: 5000,
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_payment_insert_is_rejected() {
        let store = InMemoryStore::new();

        store.insert_payment(payment("pi_999")).await.unwrap();
        let err = store.insert_payment(payment("pi_999")).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateTransaction(_)));
        assert!(store
            .find_payment_by_transaction("pi_999")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_upsert_login_touches_only_login_time() {
        let store = InMemoryStore::new();

        let first = User::new("b@x.com".to_string(), Some("Bea".to_string()), None, None);
        let created = store.upsert_login(first.clone()).await.unwrap();

        // A later login attempt supplying a different role must not win.
        let mut second = User::new(
            "b@x.com".to_string(),
            Some("Somebody Else".to_string()),
            Some(UserRole::Admin),
            None,
        );
        second.last_logged_in = created.last_logged_in + chrono::Duration::seconds(60);
        let updated = store.upsert_login(second.clone()).await.unwrap();

        assert_eq!(updated.role, UserRole::Borrower);
        assert_eq!(updated.name, Some("Bea".to_string()));
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.last_logged_in, second.last_logged_in);
    }

    #[tokio::test]
    async fn test_set_user_role_targets_one_user() {
        let store = InMemoryStore::new();
        store
            .upsert_login(User::new("a@x.com".to_string(), None, None, None))
            .await
            .unwrap();
        store
            .upsert_login(User::new("b@x.com".to_string(), None, None, None))
            .await
            .unwrap();

        let updated = store
            .set_user_role("a@x.com", UserRole::Manager)
            .await
            .unwrap();
        assert!(updated);

        let a = store.find_user("a@x.com").await.unwrap().unwrap();
        let b = store.find_user("b@x.com").await.unwrap().unwrap();
        assert_eq!(a.role, UserRole::Manager);
        assert_eq!(b.role, UserRole::Borrower);

        assert!(!store
            .set_user_role("missing@x.com", UserRole::Admin)
            .await
            .unwrap());
    }
}
