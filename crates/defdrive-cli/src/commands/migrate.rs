//! Database migration management commands.

use clap::{Args, Subcommand};

use defdrive_core::config::DatabaseBackend;
use defdrive_core::error::AppError;
use defdrive_database::DatabasePool;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;

    match &args.command {
        MigrateCommand::Run => {
            if config.database.backend == DatabaseBackend::Memory {
                output::print_warning("The memory backend has no schema; nothing to migrate.");
                return Ok(());
            }

            println!("Running database migrations...");
            let pool = DatabasePool::connect(&config.database).await?;
            defdrive_database::migration::run_migrations(pool.pool()).await?;
            pool.close().await;
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(())
}
