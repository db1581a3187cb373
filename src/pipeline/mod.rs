//! Signal pipeline.
//!
//! Every push notification flows through:
//! 1. `NotificationReconciler::handle()` — history cursor and delta fetch
//! 2. `SignalProcessor::process_message()` — per message, in delivery order
//! 3. `is_signal_message()` → `SignalExtractor::extract()` → `format_for_api()`
//! 4. `Forwarder::send_signal()` — one attempt, no retry

pub mod detector;
pub mod extractor;
pub mod payload;
pub mod processor;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod test_support;

pub use detector::is_signal_message;
pub use extractor::{SignalExtractor, SignalRecord, TextSignal};
pub use payload::{OutboundPayload, format_for_api};
pub use processor::{ProcessOutcome, SignalProcessor};
pub use reconciler::{HistoryCursor, Notification, NotificationReconciler, ReconcileOutcome};
