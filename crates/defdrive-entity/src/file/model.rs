//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// The original file name (including extension).
    pub name: String,
    /// The path within the storage provider.
    #[serde(skip_serializing)]
    pub storage_path: String,
    /// MIME type guessed at upload time.
    pub mime_type: Option<String>,
    /// File size in bytes.
    pub size_bytes: i64,
    /// SHA-256 checksum of the file content.
    pub checksum_sha256: String,
    /// Whether the file may be served to anonymous callers.
    ///
    /// Anonymous access also requires the access link itself to be public.
    pub public: bool,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Returns the MIME type, falling back to a generic binary type.
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Pre-assigned identifier (the storage path embeds it).
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// The file name.
    pub name: String,
    /// The path within the storage provider.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: Option<String>,
    /// File size in bytes.
    pub size_bytes: i64,
    /// SHA-256 checksum.
    pub checksum_sha256: String,
    /// Public flag.
    pub public: bool,
}
