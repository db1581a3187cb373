//! Mailbox access: wire types, body resolution, and the mail API client.

pub mod gmail;
pub mod resolve;
pub mod types;

pub use gmail::GmailClient;
pub use resolve::resolve;
pub use types::{HistoryRecord, RawMessage, ResolvedMessage};

use async_trait::async_trait;

use crate::error::MailError;

/// Mail API collaborator. Credentials are the implementor's concern.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// Fetch a full message. `Ok(None)` when the message does not exist.
    async fn get_message(&self, id: &str) -> Result<Option<RawMessage>, MailError>;

    /// "Message added" history records strictly after `start_history_id`, in order.
    async fn get_history(&self, start_history_id: u64) -> Result<Vec<HistoryRecord>, MailError>;
}
