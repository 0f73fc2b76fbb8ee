//! User signup and credential login.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use defdrive_auth::jwt::JwtEncoder;
use defdrive_auth::password::{PasswordHasher, PasswordValidator};
use defdrive_core::error::AppError;
use defdrive_core::result::AppResult;
use defdrive_database::store::UserStore;
use defdrive_entity::user::{CreateUser, DEFAULT_MAX_FILES, DEFAULT_MAX_STORAGE_BYTES, User};

/// Data for a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Plaintext password.
    pub password: String,
}

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    /// Bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The signed-in user.
    pub user: User,
}

/// Handles account creation and authentication.
#[derive(Debug, Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    hasher: Arc<PasswordHasher>,
    validator: Arc<PasswordValidator>,
    encoder: Arc<JwtEncoder>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        encoder: Arc<JwtEncoder>,
    ) -> Self {
        Self {
            users,
            hasher,
            validator,
            encoder,
        }
    }

    /// Registers a user with the default quotas.
    pub async fn signup(&self, req: SignupRequest) -> AppResult<User> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        self.validator.validate(&req.password)?;

        let password_hash = self.hasher.hash_password(&req.password)?;
        let user = self
            .users
            .create_user(&CreateUser {
                username: username.to_string(),
                email: req.email.filter(|e| !e.trim().is_empty()),
                display_name: req.display_name.filter(|n| !n.trim().is_empty()),
                password_hash,
                max_files: DEFAULT_MAX_FILES,
                max_storage_bytes: DEFAULT_MAX_STORAGE_BYTES,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verifies credentials and issues a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResult> {
        let invalid = || AppError::unauthorized("Invalid username or password");

        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !self.hasher.verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let (token, expires_at) = self.encoder.generate_access_token(user.id, &user.username)?;
        info!(user_id = %user.id, "User logged in");
        Ok(LoginResult {
            token,
            expires_at,
            user,
        })
    }
}
