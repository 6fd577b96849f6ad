use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::SettlementDatabase,
    db_types::{NewLedgerEntry, ReferenceCode},
    helpers::extract_payment_fact_at,
    tpe_api::{errors::IngestionError, settlement_api::SettlementApi, settlement_objects::SettlementReport},
    traits::{ChainPayout, RawMessage},
};

/// Only messages whose sender or subject mention this are treated as bank notifications.
pub const DEFAULT_SENDER_FILTER: &str = "slice";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub ledger_id: i64,
    pub reference_code: ReferenceCode,
    /// False if the payment had already been recorded by an earlier delivery of the same notification
    pub inserted: bool,
    /// The result of the settlement run triggered by a newly recorded payment
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub settlement: Option<SettlementReport>,
}

/// `IngestionApi` turns bank notification emails into ledger entries and triggers settlement for new ones.
pub struct IngestionApi<B, P> {
    settlement: SettlementApi<B, P>,
    sender_filter: String,
}

impl<B, P> Debug for IngestionApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IngestionApi (filter: {})", self.sender_filter)
    }
}

impl<B: Clone, P: Clone> Clone for IngestionApi<B, P> {
    fn clone(&self) -> Self {
        Self { settlement: self.settlement.clone(), sender_filter: self.sender_filter.clone() }
    }
}

impl<B, P> IngestionApi<B, P> {
    pub fn new(settlement: SettlementApi<B, P>) -> Self {
        Self { settlement, sender_filter: DEFAULT_SENDER_FILTER.to_string() }
    }

    pub fn settlement(&self) -> &SettlementApi<B, P> {
        &self.settlement
    }

    pub fn with_sender_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.sender_filter = filter.into().to_lowercase();
        self
    }

    /// True if the message's sender or subject mention the bank.
    pub fn is_bank_notification(&self, message: &RawMessage) -> bool {
        let filter = self.sender_filter.as_str();
        filter.is_empty() ||
            message.from.to_lowercase().contains(filter) ||
            message.subject.to_lowercase().contains(filter)
    }
}

impl<B, P> IngestionApi<B, P>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    /// Parses a notification body, records the payment and triggers settlement if the payment is new.
    pub async fn submit_notification(&self, body: &str) -> Result<IngestionOutcome, IngestionError> {
        self.ingest(body, chrono::Utc::now()).await
    }

    /// Processes a message from the mailbox. Messages that aren't bank notifications are skipped and `None` is
    /// returned.
    pub async fn process_message(&self, message: &RawMessage) -> Result<Option<IngestionOutcome>, IngestionError> {
        if !self.is_bank_notification(message) {
            trace!("📧️ Skipping message {} from {}. It is not a bank notification", message.id, message.from);
            return Ok(None);
        }
        debug!("📧️ Processing notification {} ({})", message.id, message.subject);
        self.ingest(&message.body, message.received_at).await.map(Some)
    }

    async fn ingest(
        &self,
        body: &str,
        received_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<IngestionOutcome, IngestionError> {
        let fact = extract_payment_fact_at(body, received_at).ok_or(IngestionError::ParseFailed)?;
        let entry = NewLedgerEntry::try_from(fact).map_err(|_| IngestionError::MissingReference)?;
        let reference_code = entry.reference_code.clone();
        let result = self.settlement.db().store_entry(entry).await?;
        if !result.is_new() {
            info!("📧️ Payment {reference_code} already exists as ledger entry #{}", result.id());
            return Ok(IngestionOutcome { ledger_id: result.id(), reference_code, inserted: false, settlement: None });
        }
        info!("📧️ Payment {reference_code} recorded as ledger entry #{}", result.id());
        let settlement = self.settlement.settle(&reference_code).await;
        if let Err(e) = &settlement {
            debug!("📧️ Settlement for {reference_code} did not complete. {e}");
        }
        Ok(IngestionOutcome {
            ledger_id: result.id(),
            reference_code,
            inserted: true,
            settlement: Some(SettlementReport::from(&settlement)),
        })
    }
}
