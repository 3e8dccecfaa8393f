//! Service configuration from environment variables

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rules::RuleDefaults;

/// Splunk address and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplunkCredentials {
    pub host: String,
    pub port: String,
    pub token: String,
    pub username: String,
    pub password: String,
    pub session_key: String,
}

impl SplunkCredentials {
    /// Host, port and at least one authentication method are required
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_auth = !self.token.is_empty()
            || (!self.username.is_empty() && !self.password.is_empty())
            || !self.session_key.is_empty();

        if self.host.is_empty() || self.port.is_empty() || !has_auth {
            if self.host.is_empty() {
                tracing::error!("SP_HOST not set");
            }
            if self.port.is_empty() {
                tracing::error!("SP_PORT not set");
            }
            if !has_auth {
                tracing::error!("None of SP_API_TOKEN, SP_USERNAME/SP_PASSWORD or SP_SESSION_KEY set");
            }
            return Err(ConfigError::InvalidCredentials);
        }
        Ok(())
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// CloudEvents listener port
    pub port: u16,
    /// CloudEvents listener path
    pub path: String,
    /// `local` reads resources from `resource_dir`
    pub env: String,
    pub configuration_service_url: String,
    pub resource_dir: String,
    pub event_broker_url: String,
    pub keptn_api_token: String,
    pub splunk: SplunkCredentials,
    pub rule_defaults: RuleDefaults,
    pub polling_frequency: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            path: "/".to_string(),
            env: "local".to_string(),
            configuration_service_url: String::new(),
            resource_dir: "./resources".to_string(),
            event_broker_url: "http://localhost:8081/event".to_string(),
            keptn_api_token: String::new(),
            splunk: SplunkCredentials {
                port: "8089".to_string(),
                ..Default::default()
            },
            rule_defaults: RuleDefaults::default(),
            polling_frequency: Duration::from_secs(20),
        }
    }
}

impl ProviderConfig {
    /// Read the configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("RCV_PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| ConfigError::Invalid("RCV_PORT".to_string(), p))?,
            Err(_) => defaults.port,
        };
        let polling_frequency = match std::env::var("POLLING_FREQUENCY_SECS") {
            Ok(s) => s
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid("POLLING_FREQUENCY_SECS".to_string(), s))?,
            Err(_) => defaults.polling_frequency,
        };

        let splunk = SplunkCredentials {
            host: var_or("SP_HOST", "").replace(' ', ""),
            port: var_or("SP_PORT", &defaults.splunk.port),
            token: var_or("SP_API_TOKEN", ""),
            username: var_or("SP_USERNAME", ""),
            password: var_or("SP_PASSWORD", ""),
            session_key: var_or("SP_SESSION_KEY", ""),
        };
        splunk.validate()?;

        let rule_defaults = RuleDefaults {
            cron_schedule: var_or("CRON_SCHEDULE", &defaults.rule_defaults.cron_schedule),
            earliest_time: var_or(
                "DISPATCH_EARLIEST_TIME",
                &defaults.rule_defaults.earliest_time,
            ),
            latest_time: var_or("DISPATCH_LATEST_TIME", &defaults.rule_defaults.latest_time),
            suppress_period: var_or(
                "ALERT_SUPPRESS_PERIOD",
                &defaults.rule_defaults.suppress_period,
            ),
            actions: var_or("ACTIONS", ""),
            webhook_url: var_or("WEBHOOK_URL", ""),
        };

        Ok(Self {
            port,
            path: var_or("RCV_PATH", &defaults.path),
            env: var_or("ENV", &defaults.env),
            configuration_service_url: var_or("CONFIGURATION_SERVICE", ""),
            resource_dir: var_or("RESOURCE_DIR", &defaults.resource_dir),
            event_broker_url: var_or("EVENT_BROKER_URL", &defaults.event_broker_url),
            keptn_api_token: var_or("KEPTN_API_TOKEN", ""),
            splunk,
            rule_defaults,
            polling_frequency,
        })
    }

    /// Whether resources come from the local filesystem
    pub fn is_local(&self) -> bool {
        self.env == "local"
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(String, String),

    #[error("Invalid credentials found in SP_HOST, SP_PORT, SP_API_TOKEN, SP_USERNAME, SP_PASSWORD and/or SP_SESSION_KEY")]
    InvalidCredentials,
}
