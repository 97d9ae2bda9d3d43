//! Worker configuration loaded from environment variables.

use std::time::Duration;

use postframe_core::error::CoreError;
use postframe_core::retry::RetryPolicy;
use postframe_pipeline::config::env_or;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the queue is polled when idle.
    pub poll_interval: Duration,
    /// Jobs running longer than this are presumed abandoned.
    pub stale_after: Duration,
    /// How often abandoned jobs are looked for.
    pub stale_check_interval: Duration,
    /// How often events dated before today are purged. `None` disables it.
    pub purge_interval: Option<Duration>,
    /// Backoff between attempts of a failing job.
    pub job_retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(600),
            stale_check_interval: Duration::from_secs(60),
            purge_interval: Some(Duration::from_secs(3600)),
            job_retry: RetryPolicy {
                max_attempts: u32::MAX,
                initial_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(300),
                multiplier: 2.0,
            },
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `MAPPING_POLL_INTERVAL_MS`    | `1000`  |
    /// | `MAPPING_STALE_AFTER_SECS`    | `600`   |
    /// | `MAPPING_STALE_CHECK_SECS`    | `60`    |
    /// | `EVENT_PURGE_INTERVAL_SECS`   | `3600` (`0` disables) |
    /// | `MAPPING_JOB_RETRY_BASE_SECS` | `5`     |
    /// | `MAPPING_JOB_RETRY_MAX_SECS`  | `300`   |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let poll_ms: u64 = env_or("MAPPING_POLL_INTERVAL_MS", 1000)?;
        let stale_secs: u64 = env_or("MAPPING_STALE_AFTER_SECS", defaults.stale_after.as_secs())?;
        let stale_check_secs: u64 = env_or(
            "MAPPING_STALE_CHECK_SECS",
            defaults.stale_check_interval.as_secs(),
        )?;
        let purge_secs: u64 = env_or("EVENT_PURGE_INTERVAL_SECS", 3600)?;
        let retry_base: u64 = env_or(
            "MAPPING_JOB_RETRY_BASE_SECS",
            defaults.job_retry.initial_delay.as_secs(),
        )?;
        let retry_max: u64 = env_or(
            "MAPPING_JOB_RETRY_MAX_SECS",
            defaults.job_retry.max_delay.as_secs(),
        )?;

        Ok(Self {
            poll_interval: Duration::from_millis(poll_ms.max(10)),
            stale_after: Duration::from_secs(stale_secs.max(1)),
            stale_check_interval: Duration::from_secs(stale_check_secs.max(1)),
            purge_interval: (purge_secs > 0).then(|| Duration::from_secs(purge_secs)),
            job_retry: RetryPolicy {
                initial_delay: Duration::from_secs(retry_base),
                max_delay: Duration::from_secs(retry_max.max(retry_base)),
                ..defaults.job_retry
            },
        })
    }
}
