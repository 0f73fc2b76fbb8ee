//! CLI command definitions and dispatch.

pub mod access;
pub mod migrate;
pub mod user;

use clap::{Parser, Subcommand};

use defdrive_core::config::AppConfig;
use defdrive_core::error::AppError;
use defdrive_database::store::Stores;

use crate::output::OutputFormat;

/// DefDrive: file sharing with restricted access links
#[derive(Debug, Parser)]
#[command(name = "defdrive", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// User management
    User(user::UserArgs),
    /// Access link inspection
    Access(access::AccessArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::User(args) => user::execute(args, &self.config, self.format).await,
            Commands::Access(args) => access::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    let config = AppConfig::load(config_path)?;
    config.validate()?;
    Ok(config)
}

/// Helper: open the configured metadata stores
pub async fn open_stores(config: &AppConfig) -> Result<Stores, AppError> {
    Stores::open(&config.database).await
}
