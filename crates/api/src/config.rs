use std::net::{AddrParseError, SocketAddr};

use postframe_core::error::CoreError;
use postframe_pipeline::config::env_or;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long the trigger listener and event log get to drain on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Whether `POST /hooks/entity-saved` dispatches before responding when
    /// the caller does not pass `?wait=`.
    pub hook_wait_default: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            hook_wait_default: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `HOOK_WAIT_DEFAULT`     | `true`                  |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();
        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => parse_origins(&raw),
            Err(_) => defaults.cors_origins,
        };

        Ok(Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            shutdown_timeout_secs: env_or(
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            hook_wait_default: env_or("HOOK_WAIT_DEFAULT", defaults.hook_wait_default)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
