//! Stub collaborators shared by pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use secrecy::SecretString;
use serde_json::Value;

use crate::config::SignalSettings;
use crate::error::{MailError, TransportError};
use crate::forwarder::{Forwarder, SignalTransport, TransportResponse};
use crate::mail::MailClient;
use crate::mail::types::{
    Header, HistoryRecord, MessageAdded, MessagePart, MessageRef, PartBody, RawMessage,
};

/// In-memory mailbox that records history fetches.
#[derive(Default)]
pub struct StubMail {
    messages: HashMap<String, RawMessage>,
    history: Vec<HistoryRecord>,
    fail_messages: bool,
    fail_history: bool,
    pub history_calls: Mutex<Vec<u64>>,
    pub message_calls: Mutex<Vec<String>>,
}

impl StubMail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, raw: RawMessage) -> Self {
        self.messages.insert(raw.id.clone(), raw);
        self
    }

    /// Add a history record at `history_id` announcing `message_ids`.
    pub fn with_history(mut self, history_id: u64, message_ids: &[&str]) -> Self {
        self.history.push(HistoryRecord {
            id: Some(history_id),
            messages_added: message_ids
                .iter()
                .map(|id| MessageAdded {
                    message: MessageRef {
                        id: id.to_string(),
                        thread_id: None,
                    },
                })
                .collect(),
        });
        self
    }

    pub fn failing_messages(mut self) -> Self {
        self.fail_messages = true;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub fn history_starts(&self) -> Vec<u64> {
        self.history_calls.lock().unwrap().clone()
    }

    pub fn fetched_messages(&self) -> Vec<String> {
        self.message_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailClient for StubMail {
    async fn get_message(&self, id: &str) -> Result<Option<RawMessage>, MailError> {
        self.message_calls.lock().unwrap().push(id.to_string());
        if self.fail_messages {
            return Err(MailError::Http("connection reset".into()));
        }
        Ok(self.messages.get(id).cloned())
    }

    async fn get_history(&self, start_history_id: u64) -> Result<Vec<HistoryRecord>, MailError> {
        self.history_calls.lock().unwrap().push(start_history_id);
        if self.fail_history {
            return Err(MailError::Status {
                status: 404,
                body: "historyId too old".into(),
            });
        }
        Ok(self
            .history
            .iter()
            .filter(|r| r.id.is_some_and(|id| id > start_history_id))
            .cloned()
            .collect())
    }
}

/// Transport that always answers with the same status, recording bodies.
pub struct StubTransport {
    status: u16,
    body: String,
    pub calls: AtomicUsize,
    sent: Mutex<Vec<Value>>,
}

impl StubTransport {
    pub fn status(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::status(200, "ok")
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalTransport for StubTransport {
    async fn post_json(
        &self,
        _url: &str,
        body: &Value,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(body.clone());
        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn settings() -> SignalSettings {
    SignalSettings {
        strategy_name: "Test_Strategy".into(),
        passphrase: SecretString::from("pw".to_string()),
        identifier: "SIGNAL".into(),
    }
}

pub fn forwarder(transport: Arc<StubTransport>) -> Arc<Forwarder> {
    Arc::new(Forwarder::new(
        transport,
        "https://api.example/signals",
        Duration::from_secs(30),
    ))
}

/// A single-part text/plain message with a Subject header.
pub fn plain_message(id: &str, subject: &str, body: &str) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        thread_id: format!("thread-{id}"),
        snippet: String::new(),
        payload: Some(MessagePart {
            mime_type: Some("text/plain".into()),
            headers: vec![Header {
                name: "Subject".into(),
                value: subject.to_string(),
            }],
            body: Some(PartBody {
                size: Some(body.len() as u64),
                data: Some(URL_SAFE.encode(body)),
            }),
            parts: None,
        }),
    }
}
