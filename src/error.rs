//! Error types for the signal bridge.

use std::time::Duration;

/// Top-level error type for the binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail API errors (message and history fetches).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail API request failed: {0}")]
    Http(String),

    #[error("Mail API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid mail API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MailError::InvalidResponse(e.to_string())
        } else {
            MailError::Http(e.to_string())
        }
    }
}

/// Outbound transport faults. A non-200 status is not a transport fault.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Network(String),
}

/// Inbound push-notification errors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("No Pub/Sub message received")]
    MissingEnvelope,

    #[error("Invalid Pub/Sub message format")]
    InvalidEnvelope,

    #[error("message_id required")]
    MissingMessageId,

    #[error("Failed to decode notification data: {0}")]
    Decode(String),

    #[error("Invalid notification payload: {0}")]
    Notification(#[from] serde_json::Error),
}

/// Result type alias for the bridge.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn config_step() -> Result<()> {
        let missing: std::result::Result<(), ConfigError> = Err(ConfigError::MissingRequired {
            key: "SIGNAL_API_PASSPHRASE".into(),
            hint: "Set it".into(),
        });
        missing?;
        Ok(())
    }

    #[test]
    fn config_error_lifts_into_error() {
        let err = config_step().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required configuration: SIGNAL_API_PASSPHRASE. Set it"
        );
    }

    #[test]
    fn serialization_error_lifts_into_error() {
        let err: Error = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
