//! File upload, listing, visibility and deletion for owners.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use defdrive_core::config::StorageConfig;
use defdrive_core::error::AppError;
use defdrive_core::result::AppResult;
use defdrive_core::traits::storage::{ByteStream, StorageProvider};
use defdrive_database::store::{FileStore, UserStore};
use defdrive_entity::file::{CreateFile, File};
use defdrive_storage::mime::mime_from_path;

use crate::context::RequestContext;

/// Maximum length of an uploaded file name.
const MAX_FILE_NAME_LEN: usize = 255;

/// An upload in progress.
pub struct UploadRequest {
    /// Client-supplied file name.
    pub name: String,
    /// Initial public flag.
    pub public: bool,
    /// Content type sent by the client, if any.
    pub content_type: Option<String>,
    /// File content.
    pub stream: ByteStream,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("name", &self.name)
            .field("public", &self.public)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Manages files owned by users.
#[derive(Debug, Clone)]
pub struct FileService {
    users: Arc<dyn UserStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
    max_upload_size_bytes: u64,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        users: Arc<dyn UserStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            users,
            files,
            storage,
            max_upload_size_bytes: config.max_upload_size_bytes,
        }
    }

    /// Streams an upload to storage and records it.
    ///
    /// The blob lives at `<owner_id>/<file_id>-<name>`. The upload is cut off
    /// at the smaller of the per-upload limit and the owner's remaining quota.
    pub async fn upload(&self, ctx: &RequestContext, req: UploadRequest) -> AppResult<File> {
        let name = sanitize_file_name(&req.name)?;

        let user = self
            .users
            .find_user_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        let (file_count, used_bytes) = self.files.owner_usage(user.id).await?;
        if file_count >= i64::from(user.max_files) {
            return Err(AppError::quota_exceeded(format!(
                "File limit of {} reached",
                user.max_files
            )));
        }
        let remaining = user.max_storage_bytes.saturating_sub(used_bytes);
        if remaining <= 0 {
            return Err(AppError::quota_exceeded("Storage quota exhausted"));
        }
        let limit = self.max_upload_size_bytes.min(remaining as u64);

        let file_id = Uuid::new_v4();
        let path = format!("{}/{}-{}", user.id, file_id, name);
        let written = self.storage.write_stream(&path, req.stream, limit).await?;

        let mime_type = req
            .content_type
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| mime_from_path(&name));

        let data = CreateFile {
            id: file_id,
            owner_id: user.id,
            name: name.clone(),
            storage_path: path.clone(),
            mime_type,
            size_bytes: written.size_bytes as i64,
            checksum_sha256: written.checksum_sha256,
            public: req.public,
        };

        let file = match self.files.create_file(&data).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&path).await {
                    warn!(path = %path, error = %cleanup, "Failed to remove orphaned blob");
                }
                return Err(e);
            }
        };

        info!(
            user_id = %ctx.user_id,
            file_id = %file.id,
            size_bytes = file.size_bytes,
            "File uploaded"
        );
        Ok(file)
    }

    /// Lists the caller's files.
    pub async fn list_files(&self, ctx: &RequestContext) -> AppResult<Vec<File>> {
        self.files.find_files_by_owner(ctx.user_id).await
    }

    /// Sets whether an owned file may be served to anonymous callers.
    pub async fn set_public(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        public: bool,
    ) -> AppResult<File> {
        self.owned_file(ctx, file_id).await?;
        let file = self
            .files
            .set_file_public(file_id, public)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        info!(user_id = %ctx.user_id, file_id = %file_id, public, "File visibility changed");
        Ok(file)
    }

    /// Deletes an owned file, its access records, and its blob.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<()> {
        let file = self.owned_file(ctx, file_id).await?;
        if !self.files.delete_file(file_id).await? {
            return Err(AppError::not_found("File not found"));
        }

        if let Err(e) = self.storage.delete(&file.storage_path).await {
            warn!(file_id = %file_id, error = %e, "File record deleted but blob removal failed");
        }

        info!(user_id = %ctx.user_id, file_id = %file_id, "File deleted");
        Ok(())
    }

    async fn owned_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        let file = self
            .files
            .find_file_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if file.owner_id != ctx.user_id {
            return Err(AppError::forbidden("You don't have permission to modify this file"));
        }
        Ok(file)
    }
}

/// Reduce a client-supplied name to a safe single path segment.
fn sanitize_file_name(raw: &str) -> AppResult<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::validation("A file name is required"));
    }
    if base.chars().count() > MAX_FILE_NAME_LEN {
        return Err(AppError::validation(format!(
            "File name must be at most {MAX_FILE_NAME_LEN} characters"
        )));
    }
    Ok(base.chars().filter(|c| !c.is_control()).collect())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use defdrive_core::error::ErrorKind;
    use defdrive_database::store::AccessStore;

    use super::*;
    use crate::testing::Fixture;

    fn stream_of(data: &'static [u8]) -> ByteStream {
        Box::pin(futures::stream::iter([Ok::<_, std::io::Error>(
            Bytes::from_static(data),
        )]))
    }

    fn service(fixture: &Fixture, max_upload: u64) -> FileService {
        FileService::new(
            fixture.store.clone(),
            fixture.store.clone(),
            fixture.storage.clone(),
            &StorageConfig {
                max_upload_size_bytes: max_upload,
                ..StorageConfig::default()
            },
        )
    }

    fn owner_ctx(fixture: &Fixture) -> RequestContext {
        RequestContext::new(fixture.owner.id, fixture.owner.username.clone())
    }

    #[tokio::test]
    async fn test_upload_records_checksum_and_path() {
        let fixture = Fixture::new().await;
        let files = service(&fixture, 1024);

        let file = files
            .upload(
                &owner_ctx(&fixture),
                UploadRequest {
                    name: "../../notes.txt".to_string(),
                    public: false,
                    content_type: None,
                    stream: stream_of(b"hello world"),
                },
            )
            .await
            .expect("upload");

        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.size_bytes, 11);
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(
            file.checksum_sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            file.storage_path,
            format!("{}/{}-notes.txt", fixture.owner.id, file.id)
        );
        assert!(fixture.storage.exists(&file.storage_path).await.expect("exists"));
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let fixture = Fixture::new().await;
        let files = service(&fixture, 4);

        let err = files
            .upload(
                &owner_ctx(&fixture),
                UploadRequest {
                    name: "big.bin".to_string(),
                    public: false,
                    content_type: None,
                    stream: stream_of(b"too many bytes"),
                },
            )
            .await
            .expect_err("too big");
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert_eq!(
            files.list_files(&owner_ctx(&fixture)).await.expect("list").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_set_public_requires_owner() {
        let fixture = Fixture::new().await;
        let files = service(&fixture, 1024);

        let stranger = RequestContext::new(Uuid::new_v4(), "mallory".to_string());
        let err = files
            .set_public(&stranger, fixture.file.id, false)
            .await
            .expect_err("not owner");
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let file = files
            .set_public(&owner_ctx(&fixture), fixture.file.id, false)
            .await
            .expect("toggle");
        assert!(!file.public);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_removes_blob() {
        let fixture = Fixture::new().await;
        let files = service(&fixture, 1024);
        let record = fixture.access(|_| {}).await;

        files
            .delete_file(&owner_ctx(&fixture), fixture.file.id)
            .await
            .expect("delete");

        assert!(
            fixture
                .store
                .find_access_by_link(&record.link)
                .await
                .expect("find")
                .is_none()
        );
        assert!(
            !fixture
                .storage
                .exists(&fixture.file.storage_path)
                .await
                .expect("exists")
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b\\c.txt").expect("ok"), "c.txt");
        assert!(sanitize_file_name("dir/").is_err());
        assert!(sanitize_file_name("..").is_err());
    }
}
