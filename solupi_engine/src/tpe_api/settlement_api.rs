//! The settlement engine.
//!
//! Settlement matches a ledger entry (an observed bank payment) to the order carrying the same reference code and
//! pays the order out on chain. It runs whenever either half of the match appears: when a payment notification is
//! ingested, and when a user attaches a reference to their order. Both triggers may fire concurrently and repeatedly
//! for the same reference, so every run is guarded by two compare-and-swap writes:
//!
//! 1. The ledger entry is marked used (`used: false -> true`). Only one run can consume a payment.
//! 2. The order is claimed (`PENDING | AWAITING_PAYMENT -> PROCESSING`). Only one run can pay an order.
//!
//! A run never returns with the order left in `PROCESSING`: it either completes the order or moves it back to
//! `PENDING`. The exceptions are payouts that may have landed on chain: a transfer whose outcome could not be
//! determined, and a confirmed transfer whose completion could not be written. The transfer signature is recorded
//! before the transfer is submitted, and the reconciliation pass resolves those orders.
use std::{any::Any, fmt::Debug, panic::AssertUnwindSafe};

use futures_util::FutureExt;
use log::*;

use crate::{
    db::traits::SettlementDatabase,
    db_types::{LedgerEntry, Order, OrderStatusType, ReferenceCode},
    events::{EventProducers, OrderCompletedEvent, PayoutFailedEvent},
    helpers::is_valid_wallet_address,
    tpe_api::{
        errors::{ErrorKind, SettlementError},
        settlement_objects::{SettlementConfig, SettlementOutcome},
    },
    traits::{ChainPayout, PayoutError},
};

pub struct SettlementApi<B, P> {
    db: B,
    payout: P,
    config: SettlementConfig,
    producers: EventProducers,
}

impl<B, P> Debug for SettlementApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?})", self.config)
    }
}

impl<B: Clone, P: Clone> Clone for SettlementApi<B, P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            payout: self.payout.clone(),
            config: self.config,
            producers: self.producers.clone(),
        }
    }
}

impl<B, P> SettlementApi<B, P> {
    pub fn new(db: B, payout: P, config: SettlementConfig, producers: EventProducers) -> Self {
        Self { db, payout, config, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn payout(&self) -> &P {
        &self.payout
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }
}

impl<B, P> SettlementApi<B, P>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    /// Attempts to settle the order carrying `reference`.
    ///
    /// Safe to call any number of times, from any number of tasks. At most one call ever results in a transfer.
    pub async fn settle(&self, reference: &ReferenceCode) -> Result<SettlementOutcome, SettlementError> {
        trace!("🔄️ Settlement triggered for reference {reference}");
        let order = self
            .db
            .fetch_order_by_reference(reference)
            .await?
            .ok_or_else(|| SettlementError::NoOrderForReference(reference.clone()))?;
        match order.status {
            s if s.is_payable() => {},
            OrderStatusType::Completed => return Err(SettlementError::AlreadyProcessed(order.id)),
            status => return Err(SettlementError::OrderNotPayable { order_id: order.id, status }),
        }
        let entry = self
            .db
            .fetch_entry_by_reference(reference)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotReceived(reference.clone()))?;
        if entry.used {
            return Err(SettlementError::ReferenceAlreadyUsed(reference.clone()));
        }
        self.check_amount(&order, &entry)?;

        let order_id = order.id;
        let result = AssertUnwindSafe(self.claim_and_pay(order, entry)).catch_unwind().await;
        let result = match result {
            Ok(r) => r,
            Err(panic) => Err(SettlementError::Panicked(panic_message(panic))),
        };
        match result {
            Ok(order) => {
                info!("🔄️ Order #{} settled. Transaction {}", order.id, order.chain_tx_id.as_deref().unwrap_or(""));
                self.call_order_completed_hook(&order).await;
                Ok(SettlementOutcome::Completed(order))
            },
            Err(e) if e.kind() == ErrorKind::Internal => {
                error!("🔄️ Settlement of order #{order_id} for reference {reference} failed unexpectedly. {e}");
                self.compensate(order_id, reference).await;
                Err(e)
            },
            Err(e) => {
                warn!("🔄️ Settlement of order #{order_id} for reference {reference} aborted. {e}");
                Err(e)
            },
        }
    }

    fn check_amount(&self, order: &Order, entry: &LedgerEntry) -> Result<(), SettlementError> {
        let minimum = order.amount - self.config.tolerance;
        if entry.amount >= minimum {
            return Ok(());
        }
        Err(SettlementError::InsufficientPayment {
            received: entry.amount,
            expected: order.amount,
            shortfall: order.amount - entry.amount,
        })
    }

    async fn claim_and_pay(&self, order: Order, entry: LedgerEntry) -> Result<Order, SettlementError> {
        let reference = entry.reference_code.clone();
        if !self.db.mark_used(entry.id).await? {
            return Err(SettlementError::ReferenceAlreadyUsed(reference));
        }
        debug!("🔄️ Ledger entry #{} for {reference} consumed by order #{}", entry.id, order.id);
        if !self.db.transition_order_status(order.id, &OrderStatusType::PAYABLE, OrderStatusType::Processing).await? {
            return Err(SettlementError::ClaimLost(order.id));
        }
        debug!("🔄️ Order #{} claimed for payout", order.id);

        if !is_valid_wallet_address(&order.destination_address) {
            self.release(order.id).await?;
            return Err(SettlementError::InvalidDestination(order.destination_address));
        }
        if let Some(tx_id) = &order.chain_tx_id {
            warn!("🔄️ Order #{} already carries transaction {tx_id}. Restoring its completed status", order.id);
            self.db
                .transition_order_status(order.id, &[OrderStatusType::Processing], OrderStatusType::Completed)
                .await?;
            return Err(SettlementError::AlreadyProcessed(order.id));
        }

        let amount = self.config.conversion_rate.convert(order.amount)?;
        let attempt_id = self.db.record_payout_attempt(&order, amount).await?;
        info!("🔄️ Paying out {amount} for order #{} ({}) to {}", order.id, order.amount, order.destination_address);
        let prepared = match self.payout.prepare_transfer(&order.destination_address, amount).await {
            Ok(p) => p,
            Err(e) => return self.abandon_payout(&order, attempt_id, e).await,
        };
        self.db.record_payout_signature(attempt_id, &prepared.signature, &prepared.recipient_account).await?;
        debug!("🔄️ Payout for order #{} signed as {}. Submitting", order.id, prepared.signature);
        match self.payout.submit_transfer(&prepared).await {
            Ok(receipt) => {
                self.db.record_payout_success(attempt_id, &receipt).await?;
                let completed = self
                    .db
                    .complete_order(order.id, &receipt)
                    .await?
                    .ok_or(SettlementError::CompletionRejected(order.id))?;
                Ok(completed)
            },
            Err(e) if e.is_unresolved() => {
                warn!(
                    "🔄️ Transfer {} for order #{} may or may not have landed. The order stays PROCESSING until \
                     reconciliation confirms it",
                    prepared.signature, order.id
                );
                Err(SettlementError::Payout(e))
            },
            Err(e) => self.abandon_payout(&order, attempt_id, e).await,
        }
    }

    /// Records a payout that definitely did not happen and returns the order to `PENDING`.
    async fn abandon_payout(
        &self,
        order: &Order,
        attempt_id: i64,
        e: PayoutError,
    ) -> Result<Order, SettlementError> {
        self.db.record_payout_failure(attempt_id, &e.to_string()).await?;
        self.release(order.id).await?;
        self.call_payout_failed_hook(order, &e).await;
        Err(SettlementError::Payout(e))
    }

    /// Returns a claimed order to `PENDING` so that a later trigger can retry it.
    async fn release(&self, order_id: i64) -> Result<(), SettlementError> {
        let reverted =
            self.db.transition_order_status(order_id, &[OrderStatusType::Processing], OrderStatusType::Pending).await?;
        if !reverted {
            warn!("🔄️ Order #{order_id} was expected to be PROCESSING, but could not be reverted to PENDING");
        }
        Ok(())
    }

    /// Best-effort cleanup after an unexpected failure between claim and completion.
    async fn compensate(&self, order_id: i64, reference: &ReferenceCode) {
        match self.db.fetch_latest_payout_attempt(order_id).await {
            Ok(Some(attempt)) if attempt.signature.is_some() => {
                warn!(
                    "🔄️ Order #{order_id} has a recorded payout signature. Leaving it for reconciliation rather than \
                     reverting it"
                );
                return;
            },
            Ok(_) => {},
            Err(e) => error!("🔄️ Could not check payout attempts for order #{order_id}. {e}"),
        }
        match self.db.release_processing_orders(reference).await {
            Ok(0) => trace!("🔄️ No processing orders to release for reference {reference}"),
            Ok(n) => warn!("🔄️ Released {n} processing order(s) for reference {reference} back to PENDING"),
            Err(e) => error!("🔄️ Could not release processing orders for reference {reference}. {e}"),
        }
    }

    async fn call_order_completed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_completed_producer {
            debug!("🔄️ Notifying order completed hook subscribers");
            emitter.publish_event(OrderCompletedEvent::new(order.clone())).await;
        }
    }

    async fn call_payout_failed_hook(&self, order: &Order, error: &PayoutError) {
        for emitter in &self.producers.payout_failed_producer {
            debug!("🔄️ Notifying payout failed hook subscribers");
            emitter.publish_event(PayoutFailedEvent::new(order.clone(), error.to_string(), error.needs_operator())).await;
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
