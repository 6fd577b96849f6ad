use crate::{
    db::traits::StoreError,
    db_types::{MicroUsdc, Order, PayoutAttempt, PayoutReceipt},
};

/// Audit trail of on-chain payouts. A `SUBMITTED` attempt is written before the transfer is signed, and the transfer
/// signature is attached to it before the transfer is sent, so that a crash or an unknown outcome mid-transfer leaves
/// a signature for reconciliation to check.
#[allow(async_fn_in_trait)]
pub trait PayoutRecords {
    async fn record_payout_attempt(&self, order: &Order, amount: MicroUsdc) -> Result<i64, StoreError>;

    async fn record_payout_signature(
        &self,
        attempt_id: i64,
        signature: &str,
        recipient_account: &str,
    ) -> Result<(), StoreError>;

    async fn record_payout_success(&self, attempt_id: i64, receipt: &PayoutReceipt) -> Result<(), StoreError>;

    async fn record_payout_failure(&self, attempt_id: i64, reason: &str) -> Result<(), StoreError>;

    async fn fetch_latest_payout_attempt(&self, order_id: i64) -> Result<Option<PayoutAttempt>, StoreError>;

    async fn fetch_payout_attempts(&self, order_id: i64) -> Result<Vec<PayoutAttempt>, StoreError>;
}
