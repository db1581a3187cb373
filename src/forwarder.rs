//! Forwarding of formatted signals to the downstream trading API.
//!
//! One attempt per call, no retry. Every fault is folded into a
//! [`ForwardOutcome`]; the caller decides what to do with failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::config::SignalSettings;
use crate::error::TransportError;
use crate::pipeline::payload::OutboundPayload;

/// Fields the downstream API rejects a payload without.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "strategy_name",
    "signal_sent_EPOCH",
    "signalID",
    "passphrase",
    "signal",
];

// ── Transport ───────────────────────────────────────────────────────

/// Status and raw text of an HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a JSON body to a URL. Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Network(e.to_string())
            }
        };

        // `.json()` sets `Content-Type: application/json`.
        let resp = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(map_err)?;
        Ok(TransportResponse { status, body })
    }
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Result of one forward attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardOutcome {
    pub success: bool,
    pub detail: ForwardDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ForwardDetail {
    /// HTTP 200.
    Delivered { signal_id: String, response: String },
    /// Any other status.
    Rejected { status_code: u16, response: String },
    Timeout,
    Transport { error: String },
    /// Validation failed before any network call.
    MissingFields { fields: Vec<String> },
    /// The payload could not be serialized.
    Invalid { error: String },
}

impl ForwardOutcome {
    fn success(detail: ForwardDetail) -> Self {
        Self {
            success: true,
            detail,
        }
    }

    fn failure(detail: ForwardDetail) -> Self {
        Self {
            success: false,
            detail,
        }
    }
}

// ── Forwarder ───────────────────────────────────────────────────────

/// Posts signal payloads to the configured endpoint.
pub struct Forwarder {
    transport: Arc<dyn SignalTransport>,
    api_url: String,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(transport: Arc<dyn SignalTransport>, api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            api_url: api_url.into(),
            timeout,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Forward a formatted payload.
    pub async fn send_signal(&self, payload: &OutboundPayload) -> ForwardOutcome {
        match serde_json::to_value(payload) {
            Ok(value) => self.send_json(value).await,
            Err(e) => {
                error!(error = %e, "Failed to serialize signal payload");
                ForwardOutcome::failure(ForwardDetail::Invalid {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Validate and forward an already-serialized payload.
    pub async fn send_json(&self, payload: Value) -> ForwardOutcome {
        let missing = missing_fields(&payload);
        if !missing.is_empty() {
            error!(missing = %missing.join(", "), "Missing required fields");
            return ForwardOutcome::failure(ForwardDetail::MissingFields { fields: missing });
        }

        let signal_id = payload
            .get("signalID")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match self
            .transport
            .post_json(&self.api_url, &payload, self.timeout)
            .await
        {
            Ok(resp) if resp.status == 200 => {
                info!(signal_id = %signal_id, "Signal sent successfully");
                ForwardOutcome::success(ForwardDetail::Delivered {
                    signal_id,
                    response: resp.body,
                })
            }
            Ok(resp) => {
                error!(
                    signal_id = %signal_id,
                    status = resp.status,
                    response = %resp.body,
                    "Signal API returned error status"
                );
                ForwardOutcome::failure(ForwardDetail::Rejected {
                    status_code: resp.status,
                    response: resp.body,
                })
            }
            Err(TransportError::Timeout(after)) => {
                error!(signal_id = %signal_id, timeout = ?after, "Signal request timed out");
                ForwardOutcome::failure(ForwardDetail::Timeout)
            }
            Err(TransportError::Network(reason)) => {
                error!(signal_id = %signal_id, error = %reason, "Signal request failed");
                ForwardOutcome::failure(ForwardDetail::Transport { error: reason })
            }
        }
    }

    /// Send a fixed test signal to verify connectivity.
    pub async fn send_test_signal(&self, settings: &SignalSettings) -> ForwardOutcome {
        use secrecy::ExposeSecret;

        let epoch = Utc::now().timestamp();
        let payload = json!({
            "strategy_name": settings.strategy_name,
            "signal_sent_EPOCH": epoch,
            "signalID": format!("TEST_{epoch}"),
            "passphrase": settings.passphrase.expose_secret(),
            "signal": {
                "type": "test",
                "ticker": "TEST",
                "action": "BUY",
                "note": "Test signal from Gmail Signal Integration"
            }
        });

        info!(url = %self.api_url, "Sending test signal");
        self.send_json(payload).await
    }
}

/// Required fields that are absent, null, or empty strings.
pub fn missing_fields(payload: &Value) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| match payload.get(**field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .map(|field| field.to_string())
        .collect()
}
