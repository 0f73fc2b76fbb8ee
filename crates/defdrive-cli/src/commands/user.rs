//! User management CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use defdrive_auth::jwt::JwtEncoder;
use defdrive_auth::password::{PasswordHasher, PasswordValidator};
use defdrive_core::error::AppError;
use defdrive_entity::user::User;
use defdrive_service::{SignupRequest, UserService};

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user with the default quotas
    Create {
        /// Login name
        username: String,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Username
    username: String,
    /// Email
    email: String,
    /// File quota
    max_files: i32,
    /// Storage quota
    max_storage_bytes: i64,
    /// Created at
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone().unwrap_or_default(),
            max_files: u.max_files,
            max_storage_bytes: u.max_storage_bytes,
            created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let stores = super::open_stores(&config).await?;
    let user_service = UserService::new(
        stores.users.clone(),
        Arc::new(PasswordHasher::new()),
        Arc::new(PasswordValidator::new(&config.auth)),
        Arc::new(JwtEncoder::new(&config.auth)),
    );

    match &args.command {
        UserCommand::Create {
            username,
            email,
            name,
            password,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };

            let user = user_service
                .signup(SignupRequest {
                    username: username.clone(),
                    email: email.clone(),
                    display_name: name.clone(),
                    password,
                })
                .await?;

            output::print_list(&[UserRow::from(&user)], format);
            output::print_success(&format!("User '{}' created", user.username));
        }
    }

    Ok(())
}
