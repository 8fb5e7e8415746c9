use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

/// Settings for the HTTP collaborator that talks to the shift-management backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Attempts for idempotent reads. Sends are never retried.
    pub max_retries: u32,
    pub bearer_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            bearer_token: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backend.timeout_secs must be greater than 0")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Timezone shift timestamps are localized to before classification.
    pub timezone: String,
    pub backend: BackendConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            backend: BackendConfig::default(),
        }
    }
}

impl NotificationConfig {
    /// Loads the TOML config at `path`, or defaults when the file is missing.
    /// `BACKEND_TOKEN` overrides the bearer token from the file.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!(
                timezone = %config.timezone,
                base_url = %config.backend.base_url,
                "Loaded notification config from {path}"
            );
            config
        } else {
            tracing::info!("Config file not found at {path}, using defaults");
            Self::default()
        };

        if let Ok(token) = std::env::var("BACKEND_TOKEN") {
            config.backend.bearer_token = Some(token);
        }

        config.validate()?;
        Ok(config)
    }

    /// A zero timeout would fail every backend request immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timezone(&self) -> Tz {
        shared::time::parse_timezone(&self.timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: NotificationConfig = toml::from_str(
            r#"
            timezone = "America/Bogota"

            [backend]
            base_url = "https://turnos.hospital.org"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone(), chrono_tz::America::Bogota);
        assert_eq!(config.backend.base_url, "https://turnos.hospital.org");
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.backend.max_retries, 3);
        assert!(config.backend.bearer_token.is_none());
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let config = NotificationConfig {
            timezone: "Nowhere/Special".to_string(),
            ..NotificationConfig::default()
        };
        assert_eq!(config.timezone(), Tz::UTC);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config: NotificationConfig = toml::from_str(
            r#"
            [backend]
            timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let path = std::env::temp_dir().join(format!("notification-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[backend]\ntimeout_secs = 0\n").unwrap();
        let output = NotificationConfig::load(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(output.is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = NotificationConfig::load("/definitely/not/here.toml").unwrap();
        assert_eq!(config.timezone, "UTC");
    }
}
