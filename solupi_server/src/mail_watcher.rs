use std::time::Duration;

use chrono::Utc;
use log::*;
use solupi_engine::{
    traits::{ChainPayout, Mailbox, MailboxError, RawMessage},
    ErrorKind,
    IngestionApi,
    SettlementDatabase,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

use crate::{
    config::MailConfig,
    integrations::{maildir::MaildirMailbox, solana::SolanaChain},
};

/// Upper bound on a single mailbox call.
pub const MAILBOX_TIMEOUT: Duration = Duration::from_secs(30);

/// Feeds messages from a [`Mailbox`] into the ingestion pipeline.
///
/// On start-up, messages from the configured look-back window are replayed once, so that payments received while the
/// server was offline are not missed. After that the mailbox is polled on a fixed interval.
///
/// A message is acknowledged once it has been handled: ingested, skipped, or rejected as unparseable. Messages that
/// failed because of a storage error are left unacknowledged, so the mailbox hands them out again on the next poll.
pub struct MailWatcher<M, B, P> {
    mailbox: M,
    api: IngestionApi<B, P>,
    config: MailConfig,
}

impl<M, B, P> MailWatcher<M, B, P>
where
    M: Mailbox,
    B: SettlementDatabase,
    P: ChainPayout,
{
    pub fn new(mailbox: M, api: IngestionApi<B, P>, config: MailConfig) -> Self {
        Self { mailbox, api, config }
    }

    /// Replays recent messages. Returns the number of bank notifications that were processed.
    pub async fn backfill(&mut self) -> Result<usize, MailboxError> {
        let since = Utc::now() - chrono::Duration::from_std(self.config.lookback).unwrap_or(chrono::Duration::hours(24));
        info!("📧️ Scanning for bank notifications received since {since}");
        let messages = tokio::time::timeout(MAILBOX_TIMEOUT, self.mailbox.backfill(since))
            .await
            .map_err(|_| MailboxError::Timeout)??;
        Ok(self.process(messages).await)
    }

    /// Checks the mailbox for new messages. Returns the number of bank notifications that were processed.
    pub async fn poll_once(&mut self) -> Result<usize, MailboxError> {
        let messages =
            tokio::time::timeout(MAILBOX_TIMEOUT, self.mailbox.poll_new()).await.map_err(|_| MailboxError::Timeout)??;
        Ok(self.process(messages).await)
    }

    async fn process(&mut self, messages: Vec<RawMessage>) -> usize {
        let mut count = 0;
        for message in messages {
            match self.api.process_message(&message).await {
                Ok(Some(outcome)) => {
                    count += 1;
                    let settled = outcome.settlement.as_ref().map(|s| s.settled).unwrap_or(false);
                    info!(
                        "📧️ Notification {} processed. Payment {} (new: {}, settled: {settled})",
                        message.id, outcome.reference_code, outcome.inserted
                    );
                },
                Ok(None) => {},
                Err(e) if e.kind() == ErrorKind::Internal => {
                    warn!("📧️ Could not store notification {}. It will be retried. {e}", message.id);
                    continue;
                },
                Err(e) => warn!("📧️ Could not process notification {} from {}. {e}", message.id, message.from),
            }
            if let Err(e) = self.mailbox.acknowledge(&message.id).await {
                warn!("📧️ Could not acknowledge message {}. It will be delivered again. {e}", message.id);
            }
        }
        count
    }

    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }

    /// Runs the watcher until the task is dropped.
    pub async fn run(mut self) {
        if self.config.skip_backfill {
            info!("📧️ Skipping the mailbox backfill");
        } else {
            match self.backfill().await {
                Ok(n) => info!("📧️ Backfill complete. {n} bank notifications processed"),
                Err(e) => error!("📧️ Mailbox backfill failed. {e}"),
            }
        }
        let mut timer = tokio::time::interval(self.config.poll_interval);
        info!("📧️ Watching the mailbox every {}s", self.config.poll_interval.as_secs());
        loop {
            timer.tick().await;
            if let Err(e) = self.poll_once().await {
                warn!("📧️ Could not poll the mailbox. {e}");
            }
        }
    }
}

/// Starts the mail watcher on the Maildir. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_mail_watcher(
    mailbox: MaildirMailbox,
    api: IngestionApi<SqliteDatabase, SolanaChain>,
    config: MailConfig,
) -> JoinHandle<()> {
    info!("📧️ Mail watcher started on {}", mailbox.root().display());
    tokio::spawn(MailWatcher::new(mailbox, api, config).run())
}
