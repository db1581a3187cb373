//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default downstream signal endpoint.
pub const DEFAULT_API_URL: &str = "https://mathematricks.fund/api/signals";

/// Default Gmail REST base URL.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "Gmail Signal Integration";

/// Identity and credential fields stamped onto every outbound payload.
#[derive(Debug, Clone)]
pub struct SignalSettings {
    pub strategy_name: String,
    pub passphrase: SecretString,
    /// Marker substring that flags a message as signal-bearing.
    pub identifier: String,
}

/// Mail API access.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_base: String,
    pub user_id: String,
    pub access_token: SecretString,
}

/// Full bridge configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub signal: SignalSettings,
    pub mail: MailConfig,
    pub api_url: String,
    pub forward_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl BridgeConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let passphrase = get("SIGNAL_API_PASSPHRASE");
        if passphrase.is_none() {
            missing.push("SIGNAL_API_PASSPHRASE");
        }
        let access_token = get("GMAIL_ACCESS_TOKEN");
        if access_token.is_none() {
            missing.push("GMAIL_ACCESS_TOKEN");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: missing.join(", "),
                hint: "Set them in the environment or a .env file".to_string(),
            });
        }

        let port = match get("BRIDGE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "BRIDGE_PORT".into(),
                message: e.to_string(),
            })?,
            None => 5000,
        };

        let timeout_secs = match get("FORWARD_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "FORWARD_TIMEOUT_SECS".into(),
                message: e.to_string(),
            })?,
            None => 30,
        };

        Ok(Self {
            signal: SignalSettings {
                strategy_name: get("STRATEGY_NAME")
                    .unwrap_or_else(|| "Gmail_Signal_Integration".to_string()),
                passphrase: SecretString::from(passphrase.unwrap_or_default()),
                identifier: get("SIGNAL_IDENTIFIER").unwrap_or_else(|| "SIGNAL".to_string()),
            },
            mail: MailConfig {
                api_base: get("GMAIL_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string()),
                user_id: get("GMAIL_USER_ID").unwrap_or_else(|| "me".to_string()),
                access_token: SecretString::from(access_token.unwrap_or_default()),
            },
            api_url: get("SIGNAL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            forward_timeout: Duration::from_secs(timeout_secs),
            host: get("BRIDGE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    /// Socket address string for the webhook listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
