//! Timeout and transient-retry wrapper for store calls.

use std::future::Future;

use tracing::{error, warn};

use defdrive_core::config::LinkConfig;
use defdrive_core::error::{AppError, ErrorKind};
use defdrive_core::result::AppResult;

/// Bounds every store call by a timeout and retries transient failures
/// with linear backoff.
#[derive(Debug, Clone)]
pub struct StoreGuard {
    config: LinkConfig,
}

impl StoreGuard {
    /// Creates a guard from link configuration.
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    /// Link configuration in effect.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Run `call` until it succeeds, fails permanently, or the retry budget
    /// is spent. An exhausted budget surfaces as `ServiceUnavailable`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(self.config.store_timeout(), call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::service_unavailable(format!(
                    "{operation} timed out after {}ms",
                    self.config.store_timeout_ms
                ))),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.config.transient_retries => {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "Transient store failure, retrying");
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                }
                Err(e) if e.is_transient() => {
                    error!(operation, attempts = attempt + 1, error = %e, "Store unavailable");
                    return Err(AppError::with_source(
                        ErrorKind::ServiceUnavailable,
                        format!("{operation} failed after {} attempts", attempt + 1),
                        e,
                    ));
                }
                other => return other,
            }
        }
    }
}
