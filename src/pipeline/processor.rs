//! Single-message pipeline: fetch → resolve → detect → extract → format → forward.
//!
//! Never fails outward. Fetch errors, non-signal messages, and forward
//! failures are logged and reported through [`ProcessOutcome`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::SignalSettings;
use crate::forwarder::{ForwardOutcome, Forwarder};
use crate::mail::{MailClient, resolve};
use crate::pipeline::detector::is_signal_message;
use crate::pipeline::extractor::SignalExtractor;
use crate::pipeline::payload::format_for_api;

/// What happened to one message.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The mail API call failed.
    FetchFailed { reason: String },
    /// The mail API has no such message.
    NotFound,
    /// Marker absent from subject and body.
    NotSignal,
    /// Marker present in the message but no record could be built.
    NoSignal,
    /// A payload was built and a forward attempted.
    Forwarded {
        signal_id: String,
        outcome: ForwardOutcome,
    },
}

impl ProcessOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::FetchFailed { .. } => "fetch_failed",
            ProcessOutcome::NotFound => "not_found",
            ProcessOutcome::NotSignal => "not_signal",
            ProcessOutcome::NoSignal => "no_signal",
            ProcessOutcome::Forwarded { .. } => "forwarded",
        }
    }

    /// True only when a forward was attempted and succeeded.
    pub fn is_delivered(&self) -> bool {
        matches!(self, ProcessOutcome::Forwarded { outcome, .. } if outcome.success)
    }
}

/// Runs the per-message pipeline.
pub struct SignalProcessor {
    mail: Arc<dyn MailClient>,
    forwarder: Arc<Forwarder>,
    extractor: SignalExtractor,
    settings: SignalSettings,
}

impl SignalProcessor {
    pub fn new(
        mail: Arc<dyn MailClient>,
        forwarder: Arc<Forwarder>,
        settings: SignalSettings,
    ) -> Self {
        Self {
            mail,
            forwarder,
            extractor: SignalExtractor::new(settings.identifier.clone()),
            settings,
        }
    }

    pub fn mail(&self) -> &Arc<dyn MailClient> {
        &self.mail
    }

    /// Process a single message by id.
    pub async fn process_message(&self, message_id: &str) -> ProcessOutcome {
        info!(message_id = %message_id, "Processing message");

        let raw = match self.mail.get_message(message_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!(message_id = %message_id, "Message not found");
                return ProcessOutcome::NotFound;
            }
            Err(e) => {
                error!(message_id = %message_id, error = %e, "Could not fetch message");
                return ProcessOutcome::FetchFailed {
                    reason: e.to_string(),
                };
            }
        };

        let message = resolve(&raw);
        if !is_signal_message(&message, self.extractor.identifier()) {
            debug!(message_id = %message_id, "Not a signal email");
            return ProcessOutcome::NotSignal;
        }

        let summary = message.summary();
        info!(
            message_id = %message_id,
            from = %summary.from,
            subject = %summary.subject,
            date = %summary.date,
            "Signal email detected"
        );

        let Some(signal) = self.extractor.extract(&message.body, message.subject()) else {
            info!(message_id = %message_id, "Could not extract signal");
            return ProcessOutcome::NoSignal;
        };

        let payload = format_for_api(signal, message_id, &self.settings);
        info!(
            signal_id = %payload.signal_id,
            kind = payload.signal.kind(),
            signal = %serde_json::to_string(&payload.signal).unwrap_or_default(),
            "Extracted signal"
        );

        let outcome = self.forwarder.send_signal(&payload).await;
        if outcome.success {
            info!(signal_id = %payload.signal_id, "Successfully forwarded signal");
        } else {
            warn!(signal_id = %payload.signal_id, detail = ?outcome.detail, "Failed to forward signal");
        }

        ProcessOutcome::Forwarded {
            signal_id: payload.signal_id,
            outcome,
        }
    }
}
