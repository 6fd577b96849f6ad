use std::time::Duration;

use log::*;
use solupi_engine::{traits::ChainPayout, ReconciliationApi, ReconciliationResult, SettlementDatabase, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::solana::SolanaChain;

pub const RECONCILIATION_INTERVAL: Duration = Duration::from_secs(60);

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, orders that have been `PROCESSING` for longer than `stale_after` are resolved against the payout
/// records and the chain.
pub fn start_reconciliation_worker(
    api: ReconciliationApi<SqliteDatabase, SolanaChain>,
    stale_after: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(RECONCILIATION_INTERVAL);
        info!("🕰️ Reconciliation worker started. Orders are considered stuck after {}s", stale_after.as_secs());
        loop {
            timer.tick().await;
            run_reconciliation(&api, stale_after).await;
        }
    })
}

pub async fn run_reconciliation<B, P>(api: &ReconciliationApi<B, P>, stale_after: Duration)
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    trace!("🕰️ Running reconciliation job");
    match api.reconcile_stale_orders(stale_after).await {
        Ok(result) if result.total() == 0 => trace!("🕰️ No stuck orders"),
        Ok(result) => {
            info!("🕰️ {} stuck orders reconciled", result.total());
            debug!("🕰️ {}", summary(&result));
            if !result.failed.is_empty() {
                error!(
                    "🕰️ Orders {:?} have a payout attempt that was never signed and need operator review",
                    result.failed
                );
            }
        },
        Err(e) => error!("🕰️ Error running reconciliation job: {e}"),
    }
}

fn summary(result: &ReconciliationResult) -> String {
    format!(
        "Completed: {:?}. Released: {:?}. Failed: {:?}. Unresolved: {:?}",
        result.completed, result.released, result.failed, result.unresolved
    )
}
