//! Pipeline configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use postframe_core::dispatch::{DispatchMode, DEFAULT_INLINE_LIMIT};
use postframe_core::error::CoreError;
use postframe_core::mapping::{clamp_batch_size, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE};
use postframe_core::retry::RetryPolicy;

/// Default attempt budget for a queued mapping job.
pub const DEFAULT_JOB_MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dispatch_mode: DispatchMode,
    /// Largest estimated fan-out run inline in `auto` mode.
    pub inline_limit: u64,
    /// Keys written per transaction, already clamped.
    pub batch_size: usize,
    /// Rows fetched per keyset page during resolution.
    pub page_size: i64,
    /// Retry policy for a failing batch.
    pub batch_retry: RetryPolicy,
    /// Attempts a queued job gets before it stays failed.
    pub job_max_attempts: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dispatch_mode: DispatchMode::Auto,
            inline_limit: DEFAULT_INLINE_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            batch_retry: RetryPolicy::default(),
            job_max_attempts: DEFAULT_JOB_MAX_ATTEMPTS,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `MAPPING_DISPATCH_MODE`      | `auto`  |
    /// | `MAPPING_INLINE_LIMIT`       | `100`   |
    /// | `MAPPING_BATCH_SIZE`         | `500` (clamped to 200..=1000) |
    /// | `MAPPING_PAGE_SIZE`          | `500`   |
    /// | `MAPPING_RETRY_ATTEMPTS`     | `3`     |
    /// | `MAPPING_RETRY_INITIAL_MS`   | `200`   |
    /// | `MAPPING_RETRY_MAX_MS`       | `5000`  |
    /// | `MAPPING_JOB_MAX_ATTEMPTS`   | `5`     |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();
        let retry = RetryPolicy::default();

        let batch_size: usize = env_or("MAPPING_BATCH_SIZE", defaults.batch_size)?;
        let page_size: i64 = env_or("MAPPING_PAGE_SIZE", defaults.page_size)?;
        if page_size < 1 {
            return Err(CoreError::Validation(
                "MAPPING_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        let batch_retry = RetryPolicy {
            max_attempts: env_or("MAPPING_RETRY_ATTEMPTS", retry.max_attempts)?.max(1),
            initial_delay: Duration::from_millis(env_or(
                "MAPPING_RETRY_INITIAL_MS",
                retry.initial_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(env_or(
                "MAPPING_RETRY_MAX_MS",
                retry.max_delay.as_millis() as u64,
            )?),
            multiplier: retry.multiplier,
        };

        Ok(Self {
            dispatch_mode: env_or("MAPPING_DISPATCH_MODE", defaults.dispatch_mode)?,
            inline_limit: env_or("MAPPING_INLINE_LIMIT", defaults.inline_limit)?,
            batch_size: clamp_batch_size(batch_size),
            page_size,
            batch_retry,
            job_max_attempts: env_or("MAPPING_JOB_MAX_ATTEMPTS", defaults.job_max_attempts)?
                .max(1),
        })
    }

    /// Same configuration with another dispatch mode.
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value: \"{raw}\""))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.dispatch_mode, DispatchMode::Auto);
        assert_eq!(config.inline_limit, 100);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.page_size, 500);
        assert_eq!(config.batch_retry.max_attempts, 3);
        assert_eq!(config.job_max_attempts, 5);
    }

    #[test]
    fn with_mode_overrides_dispatch() {
        let config = PipelineConfig::default().with_mode(DispatchMode::Inline);
        assert_eq!(config.dispatch_mode, DispatchMode::Inline);
    }

    #[test]
    fn missing_env_var_uses_default() {
        let value: u64 = env_or("POSTFRAME_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
