//! Outbound API payload construction.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

use crate::config::SignalSettings;
use crate::pipeline::extractor::SignalRecord;

/// Body of the downstream signal POST.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundPayload {
    pub strategy_name: String,
    #[serde(rename = "signal_sent_EPOCH")]
    pub signal_sent_epoch: i64,
    #[serde(rename = "signalID")]
    pub signal_id: String,
    #[serde(serialize_with = "expose_passphrase")]
    pub passphrase: SecretString,
    pub signal: SignalRecord,
}

fn expose_passphrase<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Build a payload stamped with the current unix time.
///
/// `signalID` embeds the formatting time, so reprocessing the same message
/// yields a different id and is not deduplicated downstream.
pub fn format_for_api(
    signal: SignalRecord,
    message_id: &str,
    settings: &SignalSettings,
) -> OutboundPayload {
    format_at(signal, message_id, settings, Utc::now().timestamp())
}

/// Build a payload for an explicit unix timestamp.
pub fn format_at(
    signal: SignalRecord,
    message_id: &str,
    settings: &SignalSettings,
    epoch: i64,
) -> OutboundPayload {
    OutboundPayload {
        strategy_name: settings.strategy_name.clone(),
        signal_sent_epoch: epoch,
        signal_id: format!("{message_id}_{epoch}"),
        passphrase: settings.passphrase.clone(),
        signal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings() -> SignalSettings {
        SignalSettings {
            strategy_name: "Gmail_Signal_Integration".into(),
            passphrase: SecretString::from("s3cret".to_string()),
            identifier: "SIGNAL".into(),
        }
    }

    #[test]
    fn payload_wire_shape() {
        let signal = SignalRecord::Raw {
            content: "SIGNAL go".into(),
        };
        let payload = format_at(signal, "18c2f0a1", &settings(), 1_700_000_000);

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "strategy_name": "Gmail_Signal_Integration",
                "signal_sent_EPOCH": 1_700_000_000,
                "signalID": "18c2f0a1_1700000000",
                "passphrase": "s3cret",
                "signal": {"type": "raw", "content": "SIGNAL go"}
            })
        );
    }

    #[test]
    fn debug_redacts_passphrase() {
        let payload = format_at(
            SignalRecord::Raw {
                content: String::new(),
            },
            "m",
            &settings(),
            1,
        );
        assert!(!format!("{payload:?}").contains("s3cret"));
    }

    #[test]
    fn signal_id_uses_current_time() {
        let before = Utc::now().timestamp();
        let payload = format_for_api(
            SignalRecord::Raw {
                content: String::new(),
            },
            "abc",
            &settings(),
        );
        assert!(payload.signal_sent_epoch >= before);
        assert_eq!(
            payload.signal_id,
            format!("abc_{}", payload.signal_sent_epoch)
        );
    }
}
