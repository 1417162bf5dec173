//! Repository layer: one storage interface per aggregate, with PostgreSQL
//! and in-memory implementations.

pub mod catalog;
pub mod loans;
pub mod lookups;
pub mod memory;
pub mod profiles;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        address::{
            AddressDetails, LibraryUserAddress, LibraryUserInfo, LookupEntry, LookupTable, NewProfile,
            ProfileUpdate,
        },
        author::{Author, AuthorName},
        loan::{LibraryUnit, UnitStatus, WorkRef},
        user::{Account, NewAccount},
        work::{Work, WorkFields, WorkKind},
    },
};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Cheap round trip to the store, used by the readiness probe
    async fn ping(&self) -> AppResult<()>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Account>>;

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// Inactive accounts registered with this email (case-insensitive)
    async fn find_inactive_by_email(&self, email: &str) -> AppResult<Vec<Account>>;

    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    /// Create an inactive account with its contact info and address, atomically.
    async fn create_with_profile(&self, account: &NewAccount, profile: &NewProfile) -> AppResult<Account>;

    /// Flip the account to active. Returns `false` if it was already active or missing.
    async fn activate(&self, id: i32) -> AppResult<bool>;

    /// Grant or revoke the staff flag. The first staff account is granted in SQL.
    async fn set_staff(&self, id: i32, is_staff: bool) -> AppResult<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_info(&self, account_id: i32) -> AppResult<Option<LibraryUserInfo>>;

    async fn get_address(&self, user_info_id: i32) -> AppResult<Option<LibraryUserAddress>>;

    async fn get_address_details(&self, user_info_id: i32) -> AppResult<Option<AddressDetails>>;

    /// Write the account email, phone and address changes in one transaction
    async fn apply_update(&self, update: &ProfileUpdate) -> AppResult<()>;
}

#[async_trait]
pub trait LookupRepository: Send + Sync {
    /// Exact-name lookup
    async fn find(&self, table: LookupTable, name: &str) -> AppResult<Option<LookupEntry>>;

    /// Fetch the row with this exact name, inserting it if missing. Must be
    /// safe against concurrent callers inserting the same name.
    async fn find_or_create(&self, table: LookupTable, name: &str) -> AppResult<LookupEntry>;

    async fn list(&self, table: LookupTable) -> AppResult<Vec<LookupEntry>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All works of a kind, ordered by title
    async fn list(&self, kind: WorkKind) -> AppResult<Vec<Work>>;

    async fn get(&self, kind: WorkKind, id: i32) -> AppResult<Option<Work>>;

    async fn exists(&self, work: WorkRef) -> AppResult<bool>;

    /// Create the work, one author row per name, and the associations, atomically.
    async fn create(&self, fields: &WorkFields, authors: &[AuthorName]) -> AppResult<Work>;

    /// Write changed fields and renamed authors in one transaction.
    async fn update(&self, id: i32, fields: Option<&WorkFields>, renamed_authors: &[Author]) -> AppResult<()>;

    /// Returns `false` when nothing was deleted
    async fn delete(&self, kind: WorkKind, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait LendingRepository: Send + Sync {
    async fn create_unit(&self, work: WorkRef, available: bool) -> AppResult<LibraryUnit>;

    async fn get_unit(&self, id: i32) -> AppResult<Option<LibraryUnit>>;

    async fn list_units(&self) -> AppResult<Vec<LibraryUnit>>;

    async fn delete_unit(&self, id: i32) -> AppResult<bool>;

    /// Mark the unit unavailable and open a status for the account.
    /// NotFound if the unit is missing, Conflict if it is not available.
    async fn issue(
        &self,
        unit_id: i32,
        account_id: i32,
        issued_at: DateTime<Utc>,
        return_due: DateTime<Utc>,
    ) -> AppResult<UnitStatus>;

    /// Close the open status and mark the unit available again.
    /// NotFound if the unit is missing, Conflict if it is not issued.
    async fn return_unit(&self, unit_id: i32, returned_at: DateTime<Utc>) -> AppResult<UnitStatus>;

    /// Most recent first
    async fn statuses_for_account(&self, account_id: i32) -> AppResult<Vec<UnitStatus>>;
}

/// All repositories, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub accounts: Arc<dyn AccountRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub lookups: Arc<dyn LookupRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub lending: Arc<dyn LendingRepository>,
}

impl Repository {
    /// Create PostgreSQL-backed repositories sharing one pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            accounts: Arc::new(users::UsersRepository::new(pool.clone())),
            profiles: Arc::new(profiles::ProfilesRepository::new(pool.clone())),
            lookups: Arc::new(lookups::LookupsRepository::new(pool.clone())),
            catalog: Arc::new(catalog::WorksRepository::new(pool.clone())),
            lending: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create repositories over a single process-local store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            accounts: store.clone(),
            profiles: store.clone(),
            lookups: store.clone(),
            catalog: store.clone(),
            lending: store,
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Database(e)
    }
}
