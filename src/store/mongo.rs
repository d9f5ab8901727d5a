//! MongoDB-backed implementation of [`MarketStore`]
//!
//! One typed collection handle per logical collection. The payments
//! collection carries a unique index on `transactionId` so duplicate
//! reconciliation attempts fail at the storage layer instead of racing
//! through the existence check.

use axum::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, to_bson};
use mongodb::options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion, UpdateOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::config::Config;
use crate::models::{Loan, LoanApplication, Payment, User, UserRole};

use super::{MarketStore, StoreError};

const LOANS: &str = "loans";
const APPLICATIONS: &str = "borrowerLoansApply";
const PAYMENTS: &str = "payments";
const USERS: &str = "users";

/// Duplicate-key write error code
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    loans: Collection<Loan>,
    applications: Collection<LoanApplication>,
    payments: Collection<Payment>,
    users: Collection<User>,
}

impl MongoStore {
    /// Connect, ping, and make sure the uniqueness indexes exist.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        tracing::info!("Connecting to document store at {}", config.mongodb_uri_masked());

        let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());

        let client = Client::with_options(options)?;
        let db = client.database(&config.mongodb_db);

        db.run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!("Document store connection established");

        let store = Self {
            loans: db.collection(LOANS),
            applications: db.collection(APPLICATIONS),
            payments: db.collection(PAYMENTS),
            users: db.collection(USERS),
            db,
        };

        store.ensure_indexes().await?;

        Ok(store)
    }

    /// Unique index on `payments.transactionId` (the reconciliation
    /// idempotency key) and on `users.email` (the natural business key).
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();

        self.payments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "transactionId": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;

        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) => {
            we.code == DUPLICATE_KEY
        }
        _ => false,
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[async_trait]
impl MarketStore for MongoStore {
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError> {
        self.loans.insert_one(&loan, None).await?;
        Ok(loan)
    }

    async fn list_loans(&self) -> Result<Vec<Loan>, StoreError> {
        let cursor = self.loans.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_loan(&self, id: &str) -> Result<Option<Loan>, StoreError> {
        Ok(self.loans.find_one(doc! { "_id": id }, None).await?)
    }

    async fn loans_by_creator(&self, email: &str) -> Result<Vec<Loan>, StoreError> {
        let cursor = self
            .loans
            .find(doc! { "createdBy.email": email }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_application(
        &self,
        application: LoanApplication,
    ) -> Result<LoanApplication, StoreError> {
        self.applications.insert_one(&application, None).await?;
        Ok(application)
    }

    async fn find_application(&self, id: &str) -> Result<Option<LoanApplication>, StoreError> {
        Ok(self.applications.find_one(doc! { "_id": id }, None).await?)
    }

    async fn applications_by_borrower(
        &self,
        email: &str,
    ) -> Result<Vec<LoanApplication>, StoreError> {
        let cursor = self
            .applications
            .find(doc! { "borrowerEmail": email }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .find_one(doc! { "transactionId": transaction_id }, None)
            .await?)
    }

    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        match self.payments.insert_one(&payment, None).await {
            Ok(_) => Ok(payment),
            Err(err) if is_duplicate_key(&err) => {
                Err(StoreError::DuplicateTransaction(payment.transaction_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn upsert_login(&self, user: User) -> Result<User, StoreError> {
        let filter = doc! { "email": &user.email };

        // Existing records only get their login time touched; everything
        // else is written on first insert.
        let update = doc! {
            "$set": { "last_loggedIn": to_bson(&user.last_logged_in)? },
            "$setOnInsert": {
                "name": to_bson(&user.name)?,
                "role": user.role.as_str(),
                "status": to_bson(&user.status)?,
                "created_at": to_bson(&user.created_at)?,
            },
        };

        self.users
            .update_one(
                filter.clone(),
                update,
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;

        self.users
            .find_one(filter, None)
            .await?
            .ok_or_else(|| StoreError::Database("upserted user not found".to_string()))
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn list_users_except(&self, email: &str) -> Result<Vec<User>, StoreError> {
        let cursor = self
            .users
            .find(doc! { "email": { "$ne": email } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$set": { "role": role.as_str() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
