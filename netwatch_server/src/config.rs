use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::settings::DEFAULT_POLLING_INTERVAL_SECS;

/// Process-level configuration read from the environment at startup.
/// Router connection settings live in the database instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_dir: String,
    pub log_spec: String,
    /// Sleep between cycles while no router is configured
    pub fallback_poll_interval: Duration,
    pub gateway_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "netwatch.db".to_string()),
            log_dir: env::var("NETWATCH_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_spec: env::var("NETWATCH_LOG").unwrap_or_else(|_| "info".to_string()),
            fallback_poll_interval: Duration::from_secs(seconds_var(
                "NETWATCH_FALLBACK_POLL_SECONDS",
                DEFAULT_POLLING_INTERVAL_SECS as u64,
            )?),
            gateway_timeout: Duration::from_secs(seconds_var(
                "NETWATCH_GATEWAY_TIMEOUT_SECONDS",
                10,
            )?),
        })
    }
}

fn seconds_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a whole number of seconds, got '{raw}'"))?;
            anyhow::ensure!(secs > 0, "{name} must be greater than zero");
            Ok(secs)
        }
        Err(_) => Ok(default),
    }
}
