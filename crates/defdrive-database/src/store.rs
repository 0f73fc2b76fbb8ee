//! Store traits consumed by the service layer.
//!
//! Each trait covers one table. The PostgreSQL repositories and the
//! [`MemoryStore`](crate::memory::MemoryStore) both implement all of them,
//! and [`Stores`] bundles whichever backend the configuration selects.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use defdrive_core::config::{DatabaseBackend, DatabaseConfig};
use defdrive_core::result::AppResult;
use defdrive_entity::access::{AccessRecord, CreateAccess};
use defdrive_entity::file::{CreateFile, File};
use defdrive_entity::user::{CreateUser, User};

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::repositories::{AccessRepository, FileRepository, UserRepository};

/// Result of a conditional save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The row matched the expected version and now holds the new state.
    Saved(AccessRecord),
    /// The row changed (or vanished) since it was read; nothing was written.
    Conflict,
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Find a user by ID.
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by login name.
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Insert a user. Fails with `Conflict` when the username is taken.
    async fn create_user(&self, data: &CreateUser) -> AppResult<User>;
}

/// File metadata persistence.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Find a file by ID.
    async fn find_file_by_id(&self, id: Uuid) -> AppResult<Option<File>>;

    /// List files owned by a user, newest first.
    async fn find_files_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<File>>;

    /// Number of files and total bytes owned by a user.
    async fn owner_usage(&self, owner_id: Uuid) -> AppResult<(i64, i64)>;

    /// Insert a file record.
    async fn create_file(&self, data: &CreateFile) -> AppResult<File>;

    /// Set the public flag. Returns `None` when the file does not exist.
    async fn set_file_public(&self, id: Uuid, public: bool) -> AppResult<Option<File>>;

    /// Delete a file record and every access record pointing at it.
    async fn delete_file(&self, id: Uuid) -> AppResult<bool>;
}

/// Access record persistence.
#[async_trait]
pub trait AccessStore: Send + Sync + std::fmt::Debug {
    /// Find an access record by ID.
    async fn find_access_by_id(&self, id: Uuid) -> AppResult<Option<AccessRecord>>;

    /// Find an access record by its public link token.
    async fn find_access_by_link(&self, link: &str) -> AppResult<Option<AccessRecord>>;

    /// List access records for a file, oldest first.
    async fn find_accesses_by_file(&self, file_id: Uuid) -> AppResult<Vec<AccessRecord>>;

    /// Whether any record already uses this link token.
    async fn link_exists(&self, link: &str) -> AppResult<bool>;

    /// Insert an access record.
    ///
    /// Fails with `Conflict` on a duplicate link and `NotFound` when the file
    /// does not exist.
    async fn create_access(&self, data: &CreateAccess) -> AppResult<AccessRecord>;

    /// Persist every mutable field of `record` if the stored version still
    /// equals `expected_version`, bumping the version on success.
    async fn compare_and_save(
        &self,
        record: &AccessRecord,
        expected_version: i64,
    ) -> AppResult<CasOutcome>;

    /// Delete an access record.
    async fn delete_access(&self, id: Uuid) -> AppResult<bool>;
}

/// Connectivity probe for the active backend.
#[async_trait]
pub trait StoreHealth: Send + Sync + std::fmt::Debug {
    /// Backend name for health reports.
    fn backend_name(&self) -> &str;

    /// Returns `Ok(true)` when the backend answers.
    async fn health_check(&self) -> AppResult<bool>;
}

/// The set of stores handed to services, all backed by one backend.
#[derive(Debug, Clone)]
pub struct Stores {
    /// User store.
    pub users: Arc<dyn UserStore>,
    /// File store.
    pub files: Arc<dyn FileStore>,
    /// Access record store.
    pub accesses: Arc<dyn AccessStore>,
    /// Health probe.
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Open the backend selected by configuration.
    ///
    /// For PostgreSQL this connects (with startup retries) and runs pending
    /// migrations.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            DatabaseBackend::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                crate::migration::run_migrations(pool.pool()).await?;
                Ok(Self::postgres(pool))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory metadata store; data is lost on restart");
                Ok(Self::memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    /// Build stores over an established PostgreSQL pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            users: Arc::new(UserRepository::new(pg.clone())),
            files: Arc::new(FileRepository::new(pg.clone())),
            accesses: Arc::new(AccessRepository::new(pg)),
            health: Arc::new(pool),
        }
    }

    /// Build stores over a shared in-memory backend.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            files: store.clone(),
            accesses: store.clone(),
            health: store,
        }
    }
}
