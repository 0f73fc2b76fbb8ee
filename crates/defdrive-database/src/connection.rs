//! PostgreSQL connection pool management.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use defdrive_core::config::DatabaseConfig;
use defdrive_core::error::{AppError, ErrorKind};
use defdrive_core::result::AppResult;

use crate::store::StoreHealth;

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    /// The underlying sqlx connection pool.
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool from configuration.
    ///
    /// The database may still be starting when the server boots, so the
    /// connection is attempted `connect_attempts` times.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let attempts = config.connect_attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::connect_once(config).await {
                Ok(pool) => {
                    info!("Successfully connected to PostgreSQL");
                    return Ok(Self { pool });
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "Failed to connect to database, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(config.connect_retry_delay_seconds))
                        .await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Database,
                        format!("Failed to connect to database after {attempts} attempts: {e}"),
                        e,
                    ));
                }
            }
        }
    }

    async fn connect_once(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

#[async_trait]
impl StoreHealth for DatabasePool {
    fn backend_name(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://defdrive:secret@db:5432/defdrive"),
            "postgres://defdrive:****@db:5432/defdrive"
        );
        assert_eq!(
            mask_password("postgres://localhost:5432/defdrive"),
            "postgres://localhost:5432/defdrive"
        );
    }
}
