//! Push-notification reconciliation against the mailbox history cursor.
//!
//! The cursor is owned by [`NotificationReconciler`] behind an async mutex
//! held for the whole read → fetch → process → write sequence, so concurrent
//! notifications are handled one at a time.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::mail::MailClient;
use crate::mail::types::{added_message_ids, history_id};
use crate::pipeline::processor::SignalProcessor;

/// Decoded push-notification payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "history_id::deserialize_opt")]
    pub history_id: Option<u64>,
}

/// Last-seen history position. Never moves backward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryCursor {
    #[default]
    Uninitialized,
    Tracking(u64),
}

/// What one notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No history id in the notification.
    Ignored,
    /// First notification: cursor recorded, nothing fetched.
    Initialized { history_id: u64 },
    /// `history_id` ≤ cursor: redundant or out-of-order delivery.
    Replayed { cursor: u64, history_id: u64 },
    /// Delta fetched and processed.
    Advanced {
        from: u64,
        to: u64,
        messages: usize,
        delivered: usize,
    },
}

/// Turns notifications into per-message processing.
pub struct NotificationReconciler {
    cursor: Mutex<HistoryCursor>,
    processor: Arc<SignalProcessor>,
}

impl NotificationReconciler {
    pub fn new(processor: Arc<SignalProcessor>) -> Self {
        Self {
            cursor: Mutex::new(HistoryCursor::Uninitialized),
            processor,
        }
    }

    pub async fn cursor(&self) -> HistoryCursor {
        *self.cursor.lock().await
    }

    /// Handle one notification.
    pub async fn handle(&self, notification: &Notification) -> ReconcileOutcome {
        let mailbox = notification.email_address.as_deref().unwrap_or("me");
        let Some(history_id) = notification.history_id else {
            info!(mailbox = %mailbox, "Notification without historyId, ignoring");
            return ReconcileOutcome::Ignored;
        };

        let mut cursor = self.cursor.lock().await;
        let prev = match *cursor {
            HistoryCursor::Uninitialized => {
                *cursor = HistoryCursor::Tracking(history_id);
                info!(mailbox = %mailbox, history_id, "Initialized with history ID");
                return ReconcileOutcome::Initialized { history_id };
            }
            HistoryCursor::Tracking(prev) if history_id <= prev => {
                info!(
                    mailbox = %mailbox,
                    history_id,
                    cursor = prev,
                    "Stale notification, cursor unchanged"
                );
                return ReconcileOutcome::Replayed {
                    cursor: prev,
                    history_id,
                };
            }
            HistoryCursor::Tracking(prev) => prev,
        };

        let message_ids = self.fetch_delta(prev, history_id).await;
        let mut delivered = 0;
        for id in &message_ids {
            if self.processor.process_message(id).await.is_delivered() {
                delivered += 1;
            }
        }

        *cursor = HistoryCursor::Tracking(history_id);
        info!(
            mailbox = %mailbox,
            from = prev,
            to = history_id,
            messages = message_ids.len(),
            delivered,
            "Notification processed"
        );

        ReconcileOutcome::Advanced {
            from: prev,
            to: history_id,
            messages: message_ids.len(),
            delivered,
        }
    }

    /// Added message ids in `(from, to]`. Fetch failures yield an empty delta.
    async fn fetch_delta(&self, from: u64, to: u64) -> Vec<String> {
        let mail: &Arc<dyn MailClient> = self.processor.mail();
        match mail.get_history(from).await {
            Ok(records) => {
                let in_range: Vec<_> = records
                    .into_iter()
                    .filter(|r| r.id.is_none_or(|id| id <= to))
                    .collect();
                added_message_ids(&in_range)
            }
            Err(e) => {
                warn!(from, to, error = %e, "Error fetching history, skipping delta");
                Vec::new()
            }
        }
    }
}
