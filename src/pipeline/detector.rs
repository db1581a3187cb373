//! Signal detection: does a resolved message carry the marker string?

use crate::mail::ResolvedMessage;

/// True iff `marker` is a case-sensitive substring of the Subject header or the body.
pub fn is_signal_message(message: &ResolvedMessage, marker: &str) -> bool {
    message.subject().contains(marker) || message.body.contains(marker)
}
