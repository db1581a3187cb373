//! Message body resolution: raw part tree → header map + plain-text body.
//!
//! Plain-text parts always win over HTML. HTML parts are used only when the
//! traversal finds no plain text at all.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::warn;

use crate::mail::types::{MessagePart, RawMessage, ResolvedMessage};

/// Part trees deeper than this are not walked.
pub const MAX_PART_DEPTH: usize = 16;

/// Resolve a raw message into headers and a flat body.
pub fn resolve(raw: &RawMessage) -> ResolvedMessage {
    let (headers, body) = match raw.payload.as_ref() {
        Some(payload) => (flatten_headers(payload), resolve_body(payload)),
        None => (HashMap::new(), String::new()),
    };

    ResolvedMessage {
        id: raw.id.clone(),
        thread_id: raw.thread_id.clone(),
        snippet: raw.snippet.clone(),
        headers,
        body,
    }
}

/// Flatten the payload header list. Later duplicates overwrite earlier ones.
pub fn flatten_headers(payload: &MessagePart) -> HashMap<String, String> {
    payload
        .headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

/// Extract the body text of a payload. Missing body → empty string.
pub fn resolve_body(payload: &MessagePart) -> String {
    // Simple message: body data directly on the payload.
    if let Some(data) = payload.data() {
        return decode_body_data(data).unwrap_or_default();
    }

    let Some(parts) = payload.parts.as_deref() else {
        return String::new();
    };

    let mut acc = BodyAccumulator::default();
    acc.walk(parts, 1);
    acc.finish()
}

#[derive(Default)]
struct BodyAccumulator {
    plain: String,
    html: String,
    found_plain: bool,
}

impl BodyAccumulator {
    fn walk(&mut self, parts: &[MessagePart], depth: usize) {
        if depth > MAX_PART_DEPTH {
            warn!(depth, "MIME part tree too deep, skipping remainder");
            return;
        }

        for part in parts {
            if let Some(children) = part.parts.as_deref() {
                self.walk(children, depth + 1);
            } else if part.is_mime("text/plain") {
                if let Some(text) = part.data().and_then(decode_body_data) {
                    self.plain.push_str(&text);
                    self.found_plain = true;
                }
            } else if part.is_mime("text/html") && !self.found_plain {
                if let Some(html) = part.data().and_then(decode_body_data) {
                    self.html.push_str(&html);
                }
            }
        }
    }

    fn finish(self) -> String {
        if self.found_plain { self.plain } else { self.html }
    }
}

/// Decode base64url body data, padded or not. Invalid UTF-8 is replaced.
pub fn decode_body_data(data: &str) -> Option<String> {
    let trimmed = data.trim().trim_end_matches('=');
    match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(error = %e, "Failed to decode message body data");
            None
        }
    }
}
