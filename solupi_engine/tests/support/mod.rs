#![allow(dead_code)]
//! Shared fixtures for the engine integration tests.
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use log::*;
use solupi_engine::{
    db_types::{MicroUsdc, NewLedgerEntry, NewOrder, Order, OrderStatusType, Paise, PayoutReceipt, ReferenceCode},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ChainPayout, PayoutError, PreparedTransfer},
    LedgerManagement,
    OrderManagement,
    PayoutRecords,
    SettlementApi,
    SettlementConfig,
    SettlementDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const ALICE_WALLET: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr";
pub const BOB_WALLET: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
pub const SAMPLE_RRN: &str = "570196198030";

#[derive(Default)]
struct PayoutState {
    prepared: AtomicUsize,
    transfers: AtomicUsize,
    failure: Mutex<Option<PayoutError>>,
    panic_on_prepare: AtomicBool,
    panic_on_submit: AtomicBool,
    unconfirmed: Mutex<HashSet<String>>,
    rejected: Mutex<HashSet<String>>,
    delay_ms: AtomicUsize,
}

/// A `ChainPayout` stub that counts transfers and can be told to fail.
///
/// Prepared transfers are signed `sig-1`, `sig-2`, ... in order.
#[derive(Clone, Default)]
pub struct CountingPayout {
    state: Arc<PayoutState>,
}

impl CountingPayout {
    pub fn transfers(&self) -> usize {
        self.state.transfers.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, error: PayoutError) {
        *self.state.failure.lock().unwrap() = Some(error);
    }

    pub fn succeed(&self) {
        *self.state.failure.lock().unwrap() = None;
    }

    pub fn panic_on_prepare(&self) {
        self.state.panic_on_prepare.store(true, Ordering::SeqCst);
    }

    pub fn panic_on_submit(&self) {
        self.state.panic_on_submit.store(true, Ordering::SeqCst);
    }

    pub fn with_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn mark_unconfirmed(&self, signature: &str) {
        self.state.unconfirmed.lock().unwrap().insert(signature.to_string());
    }

    pub fn mark_confirmed(&self, signature: &str) {
        self.state.unconfirmed.lock().unwrap().remove(signature);
    }

    pub fn mark_rejected(&self, signature: &str) {
        self.state.rejected.lock().unwrap().insert(signature.to_string());
    }
}

impl ChainPayout for CountingPayout {
    type Transaction = MicroUsdc;

    async fn initialize(&self) -> Result<(), PayoutError> {
        Ok(())
    }

    async fn prepare_transfer(
        &self,
        address: &str,
        amount: MicroUsdc,
    ) -> Result<PreparedTransfer<MicroUsdc>, PayoutError> {
        if self.state.panic_on_prepare.load(Ordering::SeqCst) {
            panic!("payout rail exploded");
        }
        let n = self.state.prepared.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PreparedTransfer::new(format!("sig-{n}"), format!("ata-{address}"), amount))
    }

    async fn submit_transfer(&self, transfer: &PreparedTransfer<MicroUsdc>) -> Result<PayoutReceipt, PayoutError> {
        let n = self.state.transfers.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.state.panic_on_submit.load(Ordering::SeqCst) {
            panic!("payout rail exploded mid-transfer");
        }
        let failure = self.state.failure.lock().unwrap().clone();
        if let Some(e) = failure {
            return Err(e);
        }
        debug!("💸️ Stub transfer #{n}: {} to {}", transfer.transaction, transfer.recipient_account);
        Ok(transfer.receipt())
    }

    async fn confirm(&self, signature: &str) -> Result<bool, PayoutError> {
        if self.state.rejected.lock().unwrap().contains(signature) {
            return Err(PayoutError::Rejected(format!("{signature} failed on chain")));
        }
        Ok(!self.state.unconfirmed.lock().unwrap().contains(signature))
    }

    async fn balance(&self) -> Result<MicroUsdc, PayoutError> {
        Ok(MicroUsdc::from_usdc(1_000))
    }
}

pub async fn setup() -> (SettlementApi<SqliteDatabase, CountingPayout>, CountingPayout) {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(
    producers: EventProducers,
) -> (SettlementApi<SqliteDatabase, CountingPayout>, CountingPayout) {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let payout = CountingPayout::default();
    let api = SettlementApi::new(db, payout.clone(), SettlementConfig::default(), producers);
    (api, payout)
}

pub async fn tear_down(db: &mut SqliteDatabase) {
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(db.url()).await.unwrap();
}

pub fn rrn(code: &str) -> ReferenceCode {
    code.parse().unwrap()
}

/// Creates an order for `rupees` and attaches `reference` to it, bypassing the settlement trigger.
pub async fn order_with_reference(db: &SqliteDatabase, rupees: i64, reference: &str) -> Order {
    let order = db
        .insert_order(NewOrder::new("alice", Paise::from_rupees(rupees), ALICE_WALLET))
        .await
        .expect("Error inserting order");
    db.attach_reference(order.id, &rrn(reference)).await.expect("Error attaching reference").unwrap()
}

pub async fn ledger_entry(db: &SqliteDatabase, amount: Paise, reference: &str) -> i64 {
    let entry = NewLedgerEntry::new(rrn(reference), amount).with_sender("Kavya Sarsawat");
    db.store_entry(entry).await.expect("Error storing ledger entry").id()
}

pub fn slice_email(rupees: &str, reference: &str) -> String {
    format!(
        "Hi Naveen,\nYou have received ₹{rupees} via UPI in your slice bank account xx6712!\nTransaction \
         date\t01-Dec-25\nFrom\tKavya Sarsawat\nRRN\t{reference}\nBest,\nTeam slice"
    )
}

/// Pushes `updated_at` back so that the order counts as stale.
pub async fn age_order(db: &SqliteDatabase, order_id: i64) {
    sqlx::query("UPDATE orders SET updated_at = datetime('now', '-1 hour') WHERE id = ?")
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error ageing order");
}

/// An order stuck in `PROCESSING` whose transfer went through, but whose completion was never written.
pub async fn stuck_order_with_signature(db: &SqliteDatabase) -> i64 {
    let order = stuck_order(db, SAMPLE_RRN).await;
    let attempt = db.record_payout_attempt(&order, MicroUsdc::from(6_020_000)).await.expect("Error recording attempt");
    db.record_payout_success(attempt, &PayoutReceipt::new("sig-stuck", "ata-stuck"))
        .await
        .expect("Error recording payout");
    order.id
}

/// An order claimed for payout that was never completed or released.
pub async fn stuck_order(db: &SqliteDatabase, reference: &str) -> Order {
    let order = order_with_reference(db, 500, reference).await;
    let claimed = db
        .transition_order_status(order.id, &OrderStatusType::PAYABLE, OrderStatusType::Processing)
        .await
        .expect("Error claiming order");
    assert!(claimed);
    age_order(db, order.id).await;
    db.fetch_order(order.id).await.unwrap().unwrap()
}
