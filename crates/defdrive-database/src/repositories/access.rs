//! Access record repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use defdrive_core::error::{AppError, ErrorKind};
use defdrive_core::result::AppResult;
use defdrive_entity::access::{AccessRecord, CreateAccess};

use super::map_insert_error;
use crate::store::{AccessStore, CasOutcome};

/// Repository for access record rows.
#[derive(Debug, Clone)]
pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    /// Create a new access repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for AccessRepository {
    async fn find_access_by_id(&self, id: Uuid) -> AppResult<Option<AccessRecord>> {
        sqlx::query_as::<_, AccessRecord>("SELECT * FROM accesses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find access", e))
    }

    async fn find_access_by_link(&self, link: &str) -> AppResult<Option<AccessRecord>> {
        sqlx::query_as::<_, AccessRecord>("SELECT * FROM accesses WHERE link = $1")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find access by link", e)
            })
    }

    async fn find_accesses_by_file(&self, file_id: Uuid) -> AppResult<Vec<AccessRecord>> {
        sqlx::query_as::<_, AccessRecord>(
            "SELECT * FROM accesses WHERE file_id = $1 ORDER BY created_at ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list accesses", e))
    }

    async fn link_exists(&self, link: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accesses WHERE link = $1)")
            .bind(link)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check link", e))
    }

    async fn create_access(&self, data: &CreateAccess) -> AppResult<AccessRecord> {
        sqlx::query_as::<_, AccessRecord>(
            "INSERT INTO accesses (id, file_id, name, link, public, subnets, ips, expires, \
             one_time_use, enable_ttl, ttl) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.file_id)
        .bind(&data.name)
        .bind(&data.link)
        .bind(data.public)
        .bind(&data.subnets)
        .bind(&data.ips)
        .bind(&data.expires)
        .bind(data.one_time_use)
        .bind(data.enable_ttl)
        .bind(data.ttl)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Access"))
    }

    async fn compare_and_save(
        &self,
        record: &AccessRecord,
        expected_version: i64,
    ) -> AppResult<CasOutcome> {
        let saved = sqlx::query_as::<_, AccessRecord>(
            "UPDATE accesses SET name = $2, public = $3, subnets = $4, ips = $5, expires = $6, \
             one_time_use = $7, used = $8, enable_ttl = $9, ttl = $10, \
             version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $11 RETURNING *",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.public)
        .bind(&record.subnets)
        .bind(&record.ips)
        .bind(&record.expires)
        .bind(record.one_time_use)
        .bind(record.used)
        .bind(record.enable_ttl)
        .bind(record.ttl)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save access", e))?;

        Ok(match saved {
            Some(record) => CasOutcome::Saved(record),
            None => CasOutcome::Conflict,
        })
    }

    async fn delete_access(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM accesses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete access", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
