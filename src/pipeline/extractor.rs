//! Signal extraction from free-form email text.
//!
//! Three strategies, first success wins:
//! 1. Embedded JSON object with a trading key
//! 2. Labeled text fields (`Ticker: AAPL`, `Action: BUY`, ...)
//! 3. Raw passthrough of the whole text

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level keys that mark a JSON object as a trading signal.
const SIGNAL_KEYS: [&str; 5] = ["ticker", "symbol", "action", "trade", "signal"];

/// Balanced braces with at most one level of nesting.
const JSON_OBJECT_PATTERN: &str = r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}";

// ── Signal record ───────────────────────────────────────────────────

/// An extracted signal. Exactly one shape per message, never merged.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalRecord {
    /// JSON object found in the text, passed through as-is.
    Structured(Map<String, Value>),
    /// Fields recognised from labeled text.
    TextFields(TextSignal),
    /// Nothing structured; the trimmed combined text.
    Raw { content: String },
}

impl SignalRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalRecord::Structured(_) => "json",
            SignalRecord::TextFields(_) => "text",
            SignalRecord::Raw { .. } => "raw",
        }
    }
}

impl Serialize for SignalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SignalRecord::Structured(map) => map.serialize(serializer),
            SignalRecord::TextFields(fields) => fields.serialize(serializer),
            SignalRecord::Raw { content } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "raw")?;
                map.serialize_entry("content", content)?;
                map.end()
            }
        }
    }
}

/// Labeled fields. Each is present only if its pattern matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextSignal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
}

// ── Extractor ───────────────────────────────────────────────────────

struct FieldPatterns {
    ticker: Regex,
    action: Regex,
    price: Regex,
    quantity: Regex,
    stop_loss: Regex,
    take_profit: Regex,
    order_type: Regex,
}

impl FieldPatterns {
    fn new() -> Self {
        Self {
            ticker: Regex::new(r"(?i)(?:ticker|symbol|stock)[\s:]+([A-Z]{1,5})").unwrap(),
            action: Regex::new(r"(?i)(?:action|side|direction)[\s:]+(\w+)").unwrap(),
            price: Regex::new(r"(?i)(?:price|entry)[\s:]+\$?([\d.]+)").unwrap(),
            quantity: Regex::new(r"(?i)(?:quantity|qty|shares|size)[\s:]+(\d+)").unwrap(),
            stop_loss: Regex::new(r"(?i)(?:stop[\s-]?loss|sl)[\s:]+\$?([\d.]+)").unwrap(),
            take_profit: Regex::new(r"(?i)(?:take[\s-]?profit|tp|target)[\s:]+\$?([\d.]+)")
                .unwrap(),
            order_type: Regex::new(r"(?i)(?:type|order[\s-]?type)[\s:]+(\w+)").unwrap(),
        }
    }
}

/// Extracts [`SignalRecord`]s from subject + body text.
pub struct SignalExtractor {
    identifier: String,
    json_object: Regex,
    fields: FieldPatterns,
}

impl SignalExtractor {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            json_object: Regex::new(JSON_OBJECT_PATTERN).unwrap(),
            fields: FieldPatterns::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Extract a signal. `None` when the marker is absent from the combined text.
    pub fn extract(&self, body: &str, subject: &str) -> Option<SignalRecord> {
        let content = format!("{subject}\n{body}");
        if !content.contains(&self.identifier) {
            return None;
        }

        if let Some(map) = self.extract_json(&content) {
            debug!(keys = map.len(), "Extracted JSON signal");
            return Some(SignalRecord::Structured(map));
        }

        if let Some(fields) = self.extract_text(&content) {
            debug!(ticker = ?fields.ticker, action = ?fields.action, "Extracted text signal");
            return Some(SignalRecord::TextFields(fields));
        }

        Some(SignalRecord::Raw {
            content: content.trim().to_string(),
        })
    }

    /// First brace-delimited candidate that parses as an object with a signal key.
    pub fn extract_json(&self, content: &str) -> Option<Map<String, Value>> {
        self.json_object.find_iter(content).find_map(|m| {
            match serde_json::from_str::<Map<String, Value>>(m.as_str()) {
                Ok(map) if SIGNAL_KEYS.iter().any(|k| map.contains_key(*k)) => Some(map),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "Skipping malformed JSON candidate");
                    None
                }
            }
        })
    }

    /// Labeled-field extraction. Accepted only if a ticker or action was found.
    pub fn extract_text(&self, content: &str) -> Option<TextSignal> {
        let capture = |re: &Regex| {
            re.captures(content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };

        let p = &self.fields;
        let signal = TextSignal {
            ticker: capture(&p.ticker),
            action: capture(&p.action),
            price: capture(&p.price),
            quantity: capture(&p.quantity),
            stop_loss: capture(&p.stop_loss),
            take_profit: capture(&p.take_profit),
            order_type: capture(&p.order_type),
        };

        if signal.ticker.is_some() || signal.action.is_some() {
            Some(signal)
        } else {
            None
        }
    }
}
