use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MailboxError {
    #[error("Mailbox I/O error: {0}")]
    Io(String),
    #[error("Mailbox operation timed out")]
    Timeout,
    #[error("Malformed message {id}: {reason}")]
    MalformedMessage { id: String, reason: String },
}

/// A message as retrieved from the mailbox, with the body already decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// A mailbox-specific unique identifier
    pub id: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// A source of bank notification emails.
///
/// Delivery is at-least-once. A message stays new until it is acknowledged, so a message whose processing failed is
/// returned again by the next poll.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// All messages received after `since`, acknowledged or not. Used once at startup to catch up on anything missed
    /// while offline.
    async fn backfill(&mut self, since: DateTime<Utc>) -> Result<Vec<RawMessage>, MailboxError>;

    /// Messages that have not been acknowledged yet.
    async fn poll_new(&mut self) -> Result<Vec<RawMessage>, MailboxError>;

    /// Marks the message with the given id as processed, so that it is not returned by [`Mailbox::poll_new`] again.
    /// Acknowledging a message twice is not an error.
    async fn acknowledge(&mut self, id: &str) -> Result<(), MailboxError>;
}
