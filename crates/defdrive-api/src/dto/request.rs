//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use defdrive_service::{AccessSettings, SignupRequest as SvcSignupRequest};

/// Signup request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    /// Login name.
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Display name.
    #[serde(alias = "name")]
    #[validate(length(max = 255))]
    pub display_name: Option<String>,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl From<SignupRequest> for SvcSignupRequest {
    fn from(req: SignupRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            display_name: req.display_name,
            password: req.password,
        }
    }
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// File visibility toggle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetFileAccessRequest {
    /// Whether anonymous callers may be served the file.
    pub public: bool,
}

/// Restriction settings for creating or updating an access record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessSettingsRequest {
    /// Free-text label.
    #[validate(length(max = 255))]
    pub name: String,
    /// Allow anonymous callers.
    pub public: bool,
    /// CIDR allow-list.
    pub subnets: Vec<String>,
    /// Literal IP allow-list.
    pub ips: Vec<String>,
    /// RFC 3339 expiry.
    pub expires: Option<String>,
    /// Single-use link.
    pub one_time_use: bool,
    /// Enforce the hop budget.
    #[serde(rename = "enableTTL")]
    pub enable_ttl: bool,
    /// Hop budget.
    #[validate(range(min = 0, message = "ttl must not be negative"))]
    pub ttl: i32,
}

impl From<AccessSettingsRequest> for AccessSettings {
    fn from(req: AccessSettingsRequest) -> Self {
        Self {
            name: req.name,
            public: req.public,
            subnets: req.subnets,
            ips: req.ips,
            expires: req.expires,
            one_time_use: req.one_time_use,
            enable_ttl: req.enable_ttl,
            ttl: req.ttl,
        }
    }
}
