use std::time::Duration;

use mockall::mock;
use solupi_engine::{
    db_types::{
        LedgerEntry,
        MicroUsdc,
        NewLedgerEntry,
        NewOrder,
        Order,
        OrderStatusType,
        PayoutAttempt,
        PayoutReceipt,
        ReferenceCode,
    },
    traits::{ChainPayout, PayoutError, PreparedTransfer, PriceOracleError, RateSource},
    InsertLedgerResult,
    LedgerManagement,
    OrderManagement,
    OrderPage,
    OrderPageQuery,
    PayoutRecords,
    SettlementDatabase,
    StoreError,
};

mock! {
    pub Store {}
    impl Clone for Store {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Store {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_by_reference(&self, reference: &ReferenceCode) -> Result<Option<Order>, StoreError>;
        async fn fetch_orders_for_user(&self, query: &OrderPageQuery) -> Result<OrderPage, StoreError>;
        async fn attach_reference(&self, id: i64, reference: &ReferenceCode) -> Result<Option<Order>, StoreError>;
        async fn transition_order_status(&self, id: i64, from: &[OrderStatusType], to: OrderStatusType) -> Result<bool, StoreError>;
        async fn complete_order(&self, id: i64, receipt: &PayoutReceipt) -> Result<Option<Order>, StoreError>;
        async fn release_processing_orders(&self, reference: &ReferenceCode) -> Result<u64, StoreError>;
        async fn fetch_stale_orders(&self, status: OrderStatusType, older_than: Duration) -> Result<Vec<Order>, StoreError>;
    }
    impl LedgerManagement for Store {
        async fn store_entry(&self, entry: NewLedgerEntry) -> Result<InsertLedgerResult, StoreError>;
        async fn fetch_entry(&self, id: i64) -> Result<Option<LedgerEntry>, StoreError>;
        async fn fetch_entry_by_reference(&self, reference: &ReferenceCode) -> Result<Option<LedgerEntry>, StoreError>;
        async fn mark_used(&self, id: i64) -> Result<bool, StoreError>;
    }
    impl PayoutRecords for Store {
        async fn record_payout_attempt(&self, order: &Order, amount: MicroUsdc) -> Result<i64, StoreError>;
        async fn record_payout_signature(&self, attempt_id: i64, signature: &str, recipient_account: &str) -> Result<(), StoreError>;
        async fn record_payout_success(&self, attempt_id: i64, receipt: &PayoutReceipt) -> Result<(), StoreError>;
        async fn record_payout_failure(&self, attempt_id: i64, reason: &str) -> Result<(), StoreError>;
        async fn fetch_latest_payout_attempt(&self, order_id: i64) -> Result<Option<PayoutAttempt>, StoreError>;
        async fn fetch_payout_attempts(&self, order_id: i64) -> Result<Vec<PayoutAttempt>, StoreError>;
    }
}

impl SettlementDatabase for MockStore {
    fn url(&self) -> &str {
        "mock://store"
    }
}

mock! {
    pub Rates {}
    impl RateSource for Rates {
        async fn fetch_usd_inr(&self) -> Result<f64, PriceOracleError>;
    }
}

/// A payout rail that always succeeds. The handlers under test never reach it unless a payment is matched.
#[derive(Debug, Clone, Default)]
pub struct StubPayout;

impl ChainPayout for StubPayout {
    type Transaction = ();

    async fn initialize(&self) -> Result<(), PayoutError> {
        Ok(())
    }

    async fn prepare_transfer(&self, address: &str, _amount: MicroUsdc) -> Result<PreparedTransfer<()>, PayoutError> {
        Ok(PreparedTransfer::new("stub-signature", format!("ata-{address}"), ()))
    }

    async fn submit_transfer(&self, transfer: &PreparedTransfer<()>) -> Result<PayoutReceipt, PayoutError> {
        Ok(transfer.receipt())
    }

    async fn confirm(&self, _signature: &str) -> Result<bool, PayoutError> {
        Ok(true)
    }

    async fn balance(&self) -> Result<MicroUsdc, PayoutError> {
        Ok(MicroUsdc::from_usdc(1_000))
    }
}
