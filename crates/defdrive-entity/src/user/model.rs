//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Default number of files a user may own.
pub const DEFAULT_MAX_FILES: i32 = 100;

/// Default total bytes a user may store (1 GiB).
pub const DEFAULT_MAX_STORAGE_BYTES: i64 = 1024 * 1024 * 1024;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Maximum number of files this user may own.
    pub max_files: i32,
    /// Maximum total bytes this user may store.
    pub max_storage_bytes: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Unique login name.
    pub username: String,
    /// Email address.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Pre-computed password hash.
    pub password_hash: String,
    /// File count quota.
    pub max_files: i32,
    /// Storage quota in bytes.
    pub max_storage_bytes: i64,
}
