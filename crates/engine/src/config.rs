//! Engine configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::EngineResult;

/// Engine configuration loaded from environment variables.
///
/// Environment variables are prefixed with `DRIPLINE_`:
/// - `DRIPLINE_MAX_ACTION_RETRIES`: retries for transient action failures (default: 2)
/// - `DRIPLINE_RETRY_INITIAL_DELAY_MS`: initial retry backoff in ms (default: 500)
/// - `DRIPLINE_RETRY_BACKOFF_MULTIPLIER`: exponential backoff factor (default: 2.0)
/// - `DRIPLINE_ABANDONED_AFTER_SECS`: heartbeat staleness before a RUNNING
///   execution is considered abandoned (default: 300)
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum retries for transient (collaborator) action failures.
    ///
    /// Permanent configuration failures are never retried. Set to 0 to
    /// disable retries entirely.
    #[serde(default = "default_max_action_retries")]
    pub max_action_retries: u32,

    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,

    /// Heartbeat staleness threshold in seconds for abandoned executions.
    #[serde(default = "default_abandoned_after_secs")]
    pub abandoned_after_secs: u64,
}

fn default_max_action_retries() -> u32 {
    2
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

fn default_abandoned_after_secs() -> u64 {
    300
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `DRIPLINE_`.
    pub fn from_env() -> EngineResult<Self> {
        Ok(envy::prefixed("DRIPLINE_").from_env::<EngineConfig>()?)
    }

    /// Backoff delay for a given retry attempt (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let ms = self.retry_initial_delay_ms as f64 * self.retry_backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(ms as u64)
    }

    /// Staleness threshold as a duration.
    pub fn abandoned_after(&self) -> Duration {
        Duration::from_secs(self.abandoned_after_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_action_retries: default_max_action_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
            abandoned_after_secs: default_abandoned_after_secs(),
        }
    }
}
