//! Mail API wire types and the resolved message view.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// ── Raw message (Gmail `format=full`) ───────────────────────────────

/// A message as returned by the mail API, before body resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub snippet: String,
    pub payload: Option<MessagePart>,
}

/// One node of the MIME part tree. The top-level payload is also a part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub body: Option<PartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    /// Encoded body data, if this part carries any.
    pub fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    pub fn is_mime(&self, mime: &str) -> bool {
        self.mime_type.as_deref() == Some(mime)
    }
}

/// Part body. `data` is base64url-encoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartBody {
    pub size: Option<u64>,
    pub data: Option<String>,
}

/// Email header (name-value pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

// ── History ─────────────────────────────────────────────────────────

/// One page of `users.history.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    pub next_page_token: Option<String>,
}

/// A single mailbox change record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "history_id::deserialize_opt")]
    pub id: Option<u64>,
    #[serde(default)]
    pub messages_added: Vec<MessageAdded>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAdded {
    pub message: MessageRef,
}

/// Reference to a message (just ID and thread ID).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Flatten history records into added message IDs, preserving order.
pub fn added_message_ids(records: &[HistoryRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.messages_added.iter())
        .map(|added| added.message.id.clone())
        .collect()
}

/// History ids arrive as JSON numbers from push notifications and as
/// numeric strings from the REST API.
pub mod history_id {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumOrString::Num(n)) => Ok(Some(n)),
            Some(NumOrString::Str(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// ── Resolved message ────────────────────────────────────────────────

/// A message flattened to a header map and plain-text body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    /// Last occurrence wins on duplicate header names.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ResolvedMessage {
    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn subject(&self) -> &str {
        self.header("Subject")
    }

    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id.clone(),
            thread_id: self.thread_id.clone(),
            from: self.header("From").to_string(),
            to: self.header("To").to_string(),
            subject: self.subject().to_string(),
            date: self.header("Date").to_string(),
            snippet: self.snippet.clone(),
        }
    }
}

/// Compact message description for logs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub snippet: String,
}
