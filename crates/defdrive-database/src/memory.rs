//! In-memory implementation of every store trait.
//!
//! Used by tests and by `database.backend = "memory"` deployments. Uniqueness
//! and compare-and-save are enforced under the DashMap shard locks, so the
//! semantics match the PostgreSQL repositories for concurrent callers.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use defdrive_core::error::AppError;
use defdrive_core::result::AppResult;
use defdrive_entity::access::{AccessRecord, CreateAccess};
use defdrive_entity::file::{CreateFile, File};
use defdrive_entity::user::{CreateUser, User};

use crate::store::{AccessStore, CasOutcome, FileStore, StoreHealth, UserStore};

/// DashMap-backed metadata store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
    files: DashMap<Uuid, File>,
    accesses: DashMap<Uuid, AccessRecord>,
    links: DashMap<String, Uuid>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        self.find_user_by_id(id).await
    }

    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        match self.usernames.entry(data.username.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("User already exists")),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    username: data.username.clone(),
                    email: data.email.clone(),
                    display_name: data.display_name.clone(),
                    password_hash: data.password_hash.clone(),
                    max_files: data.max_files,
                    max_storage_bytes: data.max_storage_bytes,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find_file_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.files.get(&id).map(|f| f.clone()))
    }

    async fn find_files_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<File>> {
        let mut files: Vec<File> = self
            .files
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .map(|f| f.clone())
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn owner_usage(&self, owner_id: Uuid) -> AppResult<(i64, i64)> {
        Ok(self
            .files
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .fold((0, 0), |(count, bytes), f| (count + 1, bytes + f.size_bytes)))
    }

    async fn create_file(&self, data: &CreateFile) -> AppResult<File> {
        if !self.users.contains_key(&data.owner_id) {
            return Err(AppError::not_found("Referenced row for File not found"));
        }
        match self.files.entry(data.id) {
            Entry::Occupied(_) => Err(AppError::conflict("File already exists")),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let file = File {
                    id: data.id,
                    owner_id: data.owner_id,
                    name: data.name.clone(),
                    storage_path: data.storage_path.clone(),
                    mime_type: data.mime_type.clone(),
                    size_bytes: data.size_bytes,
                    checksum_sha256: data.checksum_sha256.clone(),
                    public: data.public,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(file.clone());
                Ok(file)
            }
        }
    }

    async fn set_file_public(&self, id: Uuid, public: bool) -> AppResult<Option<File>> {
        Ok(self.files.get_mut(&id).map(|mut file| {
            file.public = public;
            file.updated_at = Utc::now();
            file.clone()
        }))
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        if self.files.remove(&id).is_none() {
            return Ok(false);
        }
        let orphans: Vec<(Uuid, String)> = self
            .accesses
            .iter()
            .filter(|a| a.file_id == id)
            .map(|a| (a.id, a.link.clone()))
            .collect();
        for (access_id, link) in orphans {
            self.accesses.remove(&access_id);
            self.links.remove(&link);
        }
        Ok(true)
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_access_by_id(&self, id: Uuid) -> AppResult<Option<AccessRecord>> {
        Ok(self.accesses.get(&id).map(|a| a.clone()))
    }

    async fn find_access_by_link(&self, link: &str) -> AppResult<Option<AccessRecord>> {
        let Some(id) = self.links.get(link).map(|id| *id) else {
            return Ok(None);
        };
        self.find_access_by_id(id).await
    }

    async fn find_accesses_by_file(&self, file_id: Uuid) -> AppResult<Vec<AccessRecord>> {
        let mut records: Vec<AccessRecord> = self
            .accesses
            .iter()
            .filter(|a| a.file_id == file_id)
            .map(|a| a.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn link_exists(&self, link: &str) -> AppResult<bool> {
        Ok(self.links.contains_key(link))
    }

    async fn create_access(&self, data: &CreateAccess) -> AppResult<AccessRecord> {
        // The file guard blocks a concurrent delete_file until the record
        // is visible to its cascade sweep.
        let Some(_file) = self.files.get(&data.file_id) else {
            return Err(AppError::not_found("Referenced row for Access not found"));
        };
        match self.links.entry(data.link.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("Access already exists")),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = AccessRecord {
                    id: Uuid::new_v4(),
                    file_id: data.file_id,
                    name: data.name.clone(),
                    link: data.link.clone(),
                    public: data.public,
                    subnets: data.subnets.clone(),
                    ips: data.ips.clone(),
                    expires: data.expires.clone(),
                    one_time_use: data.one_time_use,
                    used: false,
                    enable_ttl: data.enable_ttl,
                    ttl: data.ttl,
                    version: 0,
                    created_at: now,
                    updated_at: now,
                };
                self.accesses.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn compare_and_save(
        &self,
        record: &AccessRecord,
        expected_version: i64,
    ) -> AppResult<CasOutcome> {
        let Some(mut stored) = self.accesses.get_mut(&record.id) else {
            return Ok(CasOutcome::Conflict);
        };
        if stored.version != expected_version {
            return Ok(CasOutcome::Conflict);
        }

        stored.name = record.name.clone();
        stored.public = record.public;
        stored.subnets = record.subnets.clone();
        stored.ips = record.ips.clone();
        stored.expires = record.expires.clone();
        stored.one_time_use = record.one_time_use;
        stored.used = record.used;
        stored.enable_ttl = record.enable_ttl;
        stored.ttl = record.ttl;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(CasOutcome::Saved(stored.clone()))
    }

    async fn delete_access(&self, id: Uuid) -> AppResult<bool> {
        match self.accesses.remove(&id) {
            Some((_, record)) => {
                self.links.remove(&record.link);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
