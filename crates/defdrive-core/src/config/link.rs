//! Access-link resolution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry and timeout budgets for resolving public access links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// How many times a request re-evaluates after losing a commit race.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// How many times a failing store call is retried before giving up.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
    /// Base backoff between transient retries, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Upper bound on a single store call.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// Attempts at generating an unused link token before failing.
    #[serde(default = "default_token_attempts")]
    pub token_attempts: u32,
}

impl LinkConfig {
    /// Backoff to wait before the given (1-based) retry.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Timeout applied to every store call.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            conflict_retries: default_conflict_retries(),
            transient_retries: default_transient_retries(),
            retry_backoff_ms: default_retry_backoff(),
            store_timeout_ms: default_store_timeout(),
            token_attempts: default_token_attempts(),
        }
    }
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_transient_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    50
}

fn default_store_timeout() -> u64 {
    5000
}

fn default_token_attempts() -> u32 {
    8
}
