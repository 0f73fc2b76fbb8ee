//! Access record entity model.
//!
//! An access record is one shareable link bound to exactly one file. Its
//! restriction fields are owned by the file owner; its state fields
//! (`used`, `ttl`) only move forward as requests are admitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A shareable access link and its restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The file this link grants access to.
    pub file_id: Uuid,
    /// Free-text label.
    pub name: String,
    /// Public token used in URLs; unique across all records.
    pub link: String,
    /// Whether anonymous callers may use this link (the file must be public too).
    pub public: bool,
    /// CIDR allow-list; empty means unrestricted.
    pub subnets: Vec<String>,
    /// Literal IP allow-list; empty means unrestricted.
    pub ips: Vec<String>,
    /// RFC 3339 expiry instant; `None` never expires.
    pub expires: Option<String>,
    /// Whether the link dies after its first admitted request.
    pub one_time_use: bool,
    /// Set once the first admitted request consumed a one-time link.
    pub used: bool,
    /// Whether `ttl` is enforced.
    #[serde(rename = "enableTTL")]
    pub enable_ttl: bool,
    /// Remaining admitted requests when `enable_ttl` is set.
    pub ttl: i32,
    /// Optimistic-concurrency counter, bumped on every save.
    pub version: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last saved.
    pub updated_at: DateTime<Utc>,
}

impl AccessRecord {
    /// Parse the stored expiry.
    ///
    /// Returns `Ok(None)` when no expiry is set and `Err` when the stored
    /// value is not valid RFC 3339.
    pub fn parsed_expiry(&self) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
        parse_expiry(self.expires.as_deref())
    }

    /// Whether the hop budget is spent. Only meaningful with `enable_ttl`.
    pub fn ttl_exhausted(&self) -> bool {
        self.enable_ttl && self.ttl <= 0
    }
}

/// Parse an optional RFC 3339 timestamp, treating an empty string as unset.
pub fn parse_expiry(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value).map(|t| Some(t.with_timezone(&Utc))),
    }
}

/// Data required to create a new access record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccess {
    /// The file to link to.
    pub file_id: Uuid,
    /// Free-text label.
    pub name: String,
    /// Pre-generated unique token.
    pub link: String,
    /// Public flag.
    pub public: bool,
    /// CIDR allow-list.
    pub subnets: Vec<String>,
    /// IP allow-list.
    pub ips: Vec<String>,
    /// RFC 3339 expiry.
    pub expires: Option<String>,
    /// One-time-use flag.
    pub one_time_use: bool,
    /// Whether `ttl` is enforced.
    pub enable_ttl: bool,
    /// Initial hop budget.
    pub ttl: i32,
}
