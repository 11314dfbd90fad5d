use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::SyncError;
use crate::gateway::ConnectionParams;
use crate::models::SystemConfig;

/// Singleton row id of `system_config`
pub const CONFIG_ROW_ID: i32 = 1;
pub const DEFAULT_POLLING_INTERVAL_SECS: i32 = 30;
pub const DEFAULT_API_PORT: i32 = 80;

impl SystemConfig {
    /// Host present and non-blank
    pub fn is_configured(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    pub fn polling_duration(&self) -> Duration {
        Duration::from_secs(self.polling_interval.max(1) as u64)
    }

    /// Parameters for one gateway session, `None` while unconfigured
    pub fn connection_params(&self, timeout: Duration) -> Option<ConnectionParams> {
        if !self.is_configured() {
            return None;
        }
        let port = u16::try_from(self.port).ok()?;
        Some(ConnectionParams {
            host: self.host.as_deref()?.trim().to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
            port,
            use_tls: self.use_tls,
            timeout,
        })
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            id: CONFIG_ROW_ID,
            host: None,
            username: String::new(),
            password: String::new(),
            port: DEFAULT_API_PORT,
            use_tls: false,
            polling_interval: DEFAULT_POLLING_INTERVAL_SECS,
            updated_at: Utc::now().naive_utc(),
        }
    }
}

/// Partial settings update from the settings form
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<i32>,
    pub use_tls: Option<bool>,
    pub polling_interval: Option<i32>,
}

impl SettingsUpdate {
    /// Merge onto the stored row (or defaults) and validate the result
    pub fn apply(self, existing: Option<SystemConfig>) -> Result<SystemConfig, SyncError> {
        let mut settings = existing.unwrap_or_default();

        if let Some(v) = self.host {
            let trimmed = v.trim();
            settings.host = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(v) = self.username {
            settings.username = v;
        }
        // An empty password in the form means "keep the stored one".
        if let Some(v) = self.password.filter(|p| !p.is_empty()) {
            settings.password = v;
        }
        if let Some(v) = self.port {
            settings.port = v;
        }
        if let Some(v) = self.use_tls {
            settings.use_tls = v;
        }
        if let Some(v) = self.polling_interval {
            settings.polling_interval = v;
        }

        if settings.polling_interval < 1 {
            return Err(SyncError::Validation(
                "pollingInterval must be a positive number of seconds".into(),
            ));
        }
        if !(1..=65535).contains(&settings.port) {
            return Err(SyncError::Validation("port must be between 1 and 65535".into()));
        }

        settings.id = CONFIG_ROW_ID;
        settings.updated_at = Utc::now().naive_utc();
        Ok(settings)
    }
}
