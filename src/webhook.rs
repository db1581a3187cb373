//! HTTP surface: push-notification webhook, health check, manual trigger.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::config::SERVICE_NAME;
use crate::error::WebhookError;
use crate::pipeline::{Notification, NotificationReconciler, SignalProcessor};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<NotificationReconciler>,
    pub processor: Arc<SignalProcessor>,
}

impl AppState {
    pub fn new(processor: Arc<SignalProcessor>) -> Self {
        Self {
            reconciler: Arc::new(NotificationReconciler::new(Arc::clone(&processor))),
            processor,
        }
    }
}

/// Build the Axum router.
pub fn webhook_routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/test", post(trigger))
        .with_state(state)
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::MissingEnvelope
            | WebhookError::InvalidEnvelope
            | WebhookError::MissingMessageId => StatusCode::BAD_REQUEST,
            WebhookError::Decode(_) | WebhookError::Notification(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME
    }))
}

// ── Push notifications ──────────────────────────────────────────────────

/// Inner `message` of a Pub/Sub push envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubSubMessage {
    data: Option<String>,
    message_id: Option<String>,
    publish_time: Option<String>,
}

async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let result = handle_envelope(&state, &body).await;
    if let Err(ref e) = result {
        error!(error = %e, "Error processing webhook");
    }
    result
}

async fn handle_envelope(state: &AppState, body: &[u8]) -> Result<Json<Value>, WebhookError> {
    let envelope = parse_object(body).ok_or(WebhookError::MissingEnvelope)?;
    let message = envelope
        .get("message")
        .ok_or(WebhookError::InvalidEnvelope)?;
    let message: PubSubMessage =
        serde_json::from_value(message.clone()).map_err(|_| WebhookError::InvalidEnvelope)?;

    let notification = match message.data.as_deref() {
        Some(data) => decode_notification(data)?,
        None => Notification::default(),
    };

    info!(
        pubsub_id = ?message.message_id,
        publish_time = ?message.publish_time,
        mailbox = ?notification.email_address,
        history_id = ?notification.history_id,
        "Received notification"
    );

    let outcome = state.reconciler.handle(&notification).await;
    info!(outcome = ?outcome, "Notification handled");

    Ok(Json(json!({ "status": "success" })))
}

/// Non-empty JSON object, or `None`.
fn parse_object(body: &[u8]) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn decode_notification(data: &str) -> Result<Notification, WebhookError> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| WebhookError::Decode(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

// ── Manual trigger ──────────────────────────────────────────────────────

async fn trigger(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let message_id = parse_object(&body)
        .and_then(|obj| obj.get("message_id").and_then(Value::as_str).map(str::to_string))
        .filter(|id| !id.is_empty())
        .ok_or(WebhookError::MissingMessageId)?;

    let outcome = state.processor.process_message(&message_id).await;
    info!(message_id = %message_id, outcome = outcome.label(), "Manual trigger processed");

    Ok(Json(json!({
        "status": "processed",
        "message_id": message_id
    })))
}
