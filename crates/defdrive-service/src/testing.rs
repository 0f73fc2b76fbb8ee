//! Shared fixtures for service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use defdrive_core::error::AppError;
use defdrive_core::result::AppResult;
use defdrive_core::traits::storage::StorageProvider;
use defdrive_database::memory::MemoryStore;
use defdrive_database::store::{AccessStore, CasOutcome, FileStore, UserStore};
use defdrive_entity::access::{AccessRecord, CreateAccess};
use defdrive_entity::file::{CreateFile, File};
use defdrive_entity::user::{CreateUser, DEFAULT_MAX_FILES, DEFAULT_MAX_STORAGE_BYTES, User};
use defdrive_storage::LocalStorageProvider;

/// A detached file row for pure evaluator tests.
pub(crate) fn file_record(public: bool) -> File {
    let now = Utc::now();
    File {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "report.pdf".to_string(),
        storage_path: "owner/report.pdf".to_string(),
        mime_type: Some("application/pdf".to_string()),
        size_bytes: 11,
        checksum_sha256: String::new(),
        public,
        created_at: now,
        updated_at: now,
    }
}

/// A detached, unrestricted public access record.
pub(crate) fn access_record(file_id: Uuid) -> AccessRecord {
    let now = Utc::now();
    AccessRecord {
        id: Uuid::new_v4(),
        file_id,
        name: "share".to_string(),
        link: "0123456789abcdef0123456789abcdef".to_string(),
        public: true,
        subnets: Vec::new(),
        ips: Vec::new(),
        expires: None,
        one_time_use: false,
        used: false,
        enable_ttl: false,
        ttl: 0,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// A memory store seeded with one user owning one public file whose blob
/// lives in a temporary directory.
pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<LocalStorageProvider>,
    pub owner: User,
    pub file: File,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub const CONTENT: &'static [u8] = b"hello world";

    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(
            LocalStorageProvider::new(dir.path().to_str().expect("utf-8 path"))
                .await
                .expect("storage"),
        );
        let store = Arc::new(MemoryStore::new());

        let owner = store
            .create_user(&CreateUser {
                username: "owner".to_string(),
                email: None,
                display_name: None,
                password_hash: "unused".to_string(),
                max_files: DEFAULT_MAX_FILES,
                max_storage_bytes: DEFAULT_MAX_STORAGE_BYTES,
            })
            .await
            .expect("user");

        let file_id = Uuid::new_v4();
        let path = format!("{}/{}-hello.txt", owner.id, file_id);
        let chunks = futures::stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(
            Self::CONTENT,
        ))]);
        let written = storage
            .write_stream(&path, Box::pin(chunks), u64::MAX)
            .await
            .expect("blob");

        let file = store
            .create_file(&CreateFile {
                id: file_id,
                owner_id: owner.id,
                name: "hello.txt".to_string(),
                storage_path: path,
                mime_type: Some("text/plain".to_string()),
                size_bytes: written.size_bytes as i64,
                checksum_sha256: written.checksum_sha256,
                public: true,
            })
            .await
            .expect("file");

        Self {
            store,
            storage,
            owner,
            file,
            _dir: dir,
        }
    }

    /// Create an access record on the fixture file, tweaked by `customize`.
    pub async fn access(&self, customize: impl FnOnce(&mut CreateAccess)) -> AccessRecord {
        let mut data = CreateAccess {
            file_id: self.file.id,
            name: "share".to_string(),
            link: Uuid::new_v4().simple().to_string(),
            public: true,
            subnets: Vec::new(),
            ips: Vec::new(),
            expires: None,
            one_time_use: false,
            enable_ttl: false,
            ttl: 0,
        };
        customize(&mut data);
        self.store.create_access(&data).await.expect("access")
    }
}

/// Wraps a store and injects failures into `compare_and_save`.
#[derive(Debug)]
pub(crate) struct FlakyAccessStore {
    inner: Arc<MemoryStore>,
    failing_saves: AtomicU32,
    forced_conflicts: AtomicU32,
    lost_acks: AtomicU32,
}

impl FlakyAccessStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_saves: AtomicU32::new(0),
            forced_conflicts: AtomicU32::new(0),
            lost_acks: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` saves with a database error.
    pub fn fail_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Report a conflict for the next `n` saves without writing.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Persist the next `n` saves but report them as failed.
    pub fn lose_acks(&self, n: u32) {
        self.lost_acks.store(n, Ordering::SeqCst);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AccessStore for FlakyAccessStore {
    async fn find_access_by_id(&self, id: Uuid) -> AppResult<Option<AccessRecord>> {
        self.inner.find_access_by_id(id).await
    }

    async fn find_access_by_link(&self, link: &str) -> AppResult<Option<AccessRecord>> {
        self.inner.find_access_by_link(link).await
    }

    async fn find_accesses_by_file(&self, file_id: Uuid) -> AppResult<Vec<AccessRecord>> {
        self.inner.find_accesses_by_file(file_id).await
    }

    async fn link_exists(&self, link: &str) -> AppResult<bool> {
        self.inner.link_exists(link).await
    }

    async fn create_access(&self, data: &CreateAccess) -> AppResult<AccessRecord> {
        self.inner.create_access(data).await
    }

    async fn compare_and_save(
        &self,
        record: &AccessRecord,
        expected_version: i64,
    ) -> AppResult<CasOutcome> {
        if Self::take(&self.failing_saves) {
            return Err(AppError::database("connection reset by peer"));
        }
        if Self::take(&self.forced_conflicts) {
            return Ok(CasOutcome::Conflict);
        }
        let outcome = self.inner.compare_and_save(record, expected_version).await?;
        if Self::take(&self.lost_acks) {
            return Err(AppError::database("connection closed before commit acknowledged"));
        }
        Ok(outcome)
    }

    async fn delete_access(&self, id: Uuid) -> AppResult<bool> {
        self.inner.delete_access(id).await
    }
}
