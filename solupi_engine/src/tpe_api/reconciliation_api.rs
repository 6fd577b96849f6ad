//! Recovery for orders stuck in `PROCESSING`.
//!
//! Settlement never leaves an order in `PROCESSING` on its own, but a crash or a failed database write between
//! claiming an order and completing it can. The payout attempt log tells us how far the run got:
//!
//! * no attempt was recorded: the transfer never started, so the order is released back to `PENDING`.
//! * the attempt carries a signature: the transfer was signed and may have been sent. Once the chain confirms it, the
//!   order is completed. If the chain reports that it failed, the attempt is marked failed and the order released.
//! * the attempt was marked failed: the transfer definitely did not happen, so the order is released.
//! * the attempt was submitted but has no signature: the run stopped somewhere between recording the attempt and
//!   signing the transfer. The order is marked `FAILED` for an operator to review, and is never retried automatically.
use std::{fmt::Debug, time::Duration};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::SettlementDatabase,
    db_types::{Order, OrderStatusType, PayoutAttempt, PayoutReceipt, PayoutStatusType},
    events::{EventProducers, OrderCompletedEvent},
    tpe_api::errors::SettlementError,
    traits::{ChainPayout, PayoutError},
};

/// Orders that have been `PROCESSING` for longer than this are considered stuck.
pub const DEFAULT_RECONCILE_AFTER: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub completed: Vec<i64>,
    pub released: Vec<i64>,
    pub failed: Vec<i64>,
    /// Orders that were left alone this time round, e.g. because their transfer is not confirmed yet
    pub unresolved: Vec<i64>,
}

impl ReconciliationResult {
    pub fn total(&self) -> usize {
        self.completed.len() + self.released.len() + self.failed.len() + self.unresolved.len()
    }
}

enum Resolution {
    Completed(Order),
    Released,
    Failed,
    Unresolved,
}

pub struct ReconciliationApi<B, P> {
    db: B,
    payout: P,
    producers: EventProducers,
}

impl<B, P> Debug for ReconciliationApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, P> ReconciliationApi<B, P> {
    pub fn new(db: B, payout: P, producers: EventProducers) -> Self {
        Self { db, payout, producers }
    }
}

impl<B, P> ReconciliationApi<B, P>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    pub async fn reconcile_stale_orders(&self, older_than: Duration) -> Result<ReconciliationResult, SettlementError> {
        let orders = self.db.fetch_stale_orders(OrderStatusType::Processing, older_than).await?;
        let mut result = ReconciliationResult::default();
        for order in orders {
            let id = order.id;
            match self.reconcile_order(order).await {
                Ok(Resolution::Completed(order)) => {
                    info!("🕰️ Order #{id} completed by reconciliation");
                    for emitter in &self.producers.order_completed_producer {
                        emitter.publish_event(OrderCompletedEvent::new(order.clone())).await;
                    }
                    result.completed.push(id);
                },
                Ok(Resolution::Released) => {
                    info!("🕰️ Order #{id} released back to PENDING by reconciliation");
                    result.released.push(id);
                },
                Ok(Resolution::Failed) => {
                    warn!("🕰️ Order #{id} has a payout attempt that was never signed. Marked FAILED for review");
                    result.failed.push(id);
                },
                Ok(Resolution::Unresolved) => {
                    debug!("🕰️ Order #{id} could not be resolved yet");
                    result.unresolved.push(id);
                },
                Err(e) => {
                    warn!("🕰️ Could not reconcile order #{id}. {e}");
                    result.unresolved.push(id);
                },
            }
        }
        Ok(result)
    }

    async fn reconcile_order(&self, order: Order) -> Result<Resolution, SettlementError> {
        let attempt = self.db.fetch_latest_payout_attempt(order.id).await?;
        match attempt {
            None => self.move_order(order.id, OrderStatusType::Pending, Resolution::Released).await,
            Some(PayoutAttempt { id, signature: Some(signature), recipient_account, .. }) => {
                match self.payout.confirm(&signature).await {
                    Ok(true) => {},
                    Ok(false) => return Ok(Resolution::Unresolved),
                    Err(e @ PayoutError::Rejected(_)) => {
                        info!("🕰️ Transfer {signature} for order #{} failed on chain. {e}", order.id);
                        self.db.record_payout_failure(id, &e.to_string()).await?;
                        return self.move_order(order.id, OrderStatusType::Pending, Resolution::Released).await;
                    },
                    Err(e) => return Err(e.into()),
                }
                let receipt = PayoutReceipt::new(signature, recipient_account.unwrap_or_default());
                let completed = self.db.complete_order(order.id, &receipt).await?;
                Ok(completed.map(Resolution::Completed).unwrap_or(Resolution::Unresolved))
            },
            Some(PayoutAttempt { status: PayoutStatusType::Failed, .. }) => {
                self.move_order(order.id, OrderStatusType::Pending, Resolution::Released).await
            },
            Some(_) => self.move_order(order.id, OrderStatusType::Failed, Resolution::Failed).await,
        }
    }

    async fn move_order(
        &self,
        order_id: i64,
        to: OrderStatusType,
        resolution: Resolution,
    ) -> Result<Resolution, SettlementError> {
        let moved = self.db.transition_order_status(order_id, &[OrderStatusType::Processing], to).await?;
        Ok(if moved { resolution } else { Resolution::Unresolved })
    }
}
