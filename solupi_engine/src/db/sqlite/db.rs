use std::{fmt::Debug, time::Duration};

use log::*;
use sqlx::{migrate, SqlitePool};

use super::{db_url, ledger, new_pool, orders, payouts, SqliteDatabaseError};
use crate::{
    db::traits::{
        InsertLedgerResult,
        LedgerManagement,
        OrderManagement,
        OrderPage,
        OrderPageQuery,
        PayoutRecords,
        SettlementDatabase,
        StoreError,
    },
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
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::insert_order(order, &mut conn).await?)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_reference(&self, reference: &ReferenceCode) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order_by_reference(reference, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, query: &OrderPageQuery) -> Result<OrderPage, StoreError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let page = orders::fetch_orders_for_user(query, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        Ok(page)
    }

    async fn attach_reference(&self, id: i64, reference: &ReferenceCode) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::attach_reference(id, reference, &mut conn).await?;
        if order.is_some() {
            debug!("🗃️ Reference {reference} attached to order #{id}");
        }
        Ok(order)
    }

    async fn transition_order_status(
        &self,
        id: i64,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::transition_status(id, from, to, &mut conn).await?)
    }

    async fn complete_order(&self, id: i64, receipt: &PayoutReceipt) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::complete_order(id, receipt, &mut conn).await?;
        if order.is_some() {
            debug!("🗃️ Order #{id} marked as completed with transaction {}", receipt.signature);
        }
        Ok(order)
    }

    async fn release_processing_orders(&self, reference: &ReferenceCode) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::release_processing_orders(reference, &mut conn).await?)
    }

    async fn fetch_stale_orders(
        &self,
        status: OrderStatusType,
        older_than: Duration,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_stale_orders(status, older_than, &mut conn).await?)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn store_entry(&self, entry: NewLedgerEntry) -> Result<InsertLedgerResult, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::idempotent_insert(entry, &mut conn).await?)
    }

    async fn fetch_entry(&self, id: i64) -> Result<Option<LedgerEntry>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::fetch_entry_by_id(id, &mut conn).await?)
    }

    async fn fetch_entry_by_reference(&self, reference: &ReferenceCode) -> Result<Option<LedgerEntry>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::fetch_entry_by_reference(reference, &mut conn).await?)
    }

    async fn mark_used(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let marked = ledger::mark_used(id, &mut conn).await?;
        trace!("🗃️ Ledger entry #{id} mark used: {marked}");
        Ok(marked)
    }
}

impl PayoutRecords for SqliteDatabase {
    async fn record_payout_attempt(&self, order: &Order, amount: MicroUsdc) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(payouts::insert_attempt(order, amount, &mut conn).await?)
    }

    async fn record_payout_signature(
        &self,
        attempt_id: i64,
        signature: &str,
        recipient_account: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        payouts::mark_signed(attempt_id, signature, recipient_account, &mut conn).await?;
        trace!("🗃️ Payout attempt #{attempt_id} signed as {signature}");
        Ok(())
    }

    async fn record_payout_success(&self, attempt_id: i64, receipt: &PayoutReceipt) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(payouts::mark_confirmed(attempt_id, receipt, &mut conn).await?)
    }

    async fn record_payout_failure(&self, attempt_id: i64, reason: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(payouts::mark_failed(attempt_id, reason, &mut conn).await?)
    }

    async fn fetch_latest_payout_attempt(&self, order_id: i64) -> Result<Option<PayoutAttempt>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(payouts::fetch_latest_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_payout_attempts(&self, order_id: i64) -> Result<Vec<PayoutAttempt>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(payouts::fetch_for_order(order_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `SOLUPI_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created SQLite connection pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
