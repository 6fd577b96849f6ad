mod support;

use solupi_engine::{
    db_types::{MicroUsdc, NewOrder, Order, OrderStatusType, Paise, PayoutReceipt, PayoutStatusType},
    OrderManagement,
    PayoutRecords,
    SqliteDatabase,
};
use sqlx::pool::PoolConnection;
use support::*;

/// Reads the order on a connection that the store cannot use for its own writes.
async fn read_order(conn: &mut PoolConnection<sqlx::Sqlite>, id: i64) -> Order {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_one(&mut **conn)
        .await
        .expect("Error reading order")
}

async fn new_order(db: &SqliteDatabase) -> Order {
    db.insert_order(NewOrder::new("alice", Paise::from_rupees(500), ALICE_WALLET)).await.expect("Error inserting order")
}

#[tokio::test]
async fn attached_reference_is_visible_to_other_connections() {
    let (api, _) = setup().await;
    let db = api.db();
    let order = new_order(db).await;
    let mut reader = db.pool().acquire().await.unwrap();

    let attached = db.attach_reference(order.id, &rrn(SAMPLE_RRN)).await.unwrap().expect("Order should accept it");
    assert_eq!(attached.status, OrderStatusType::AwaitingPayment);
    let stored = read_order(&mut reader, order.id).await;
    assert_eq!(stored.status, OrderStatusType::AwaitingPayment);
    assert_eq!(stored.reference_code.as_ref().map(|r| r.as_str()), Some(SAMPLE_RRN));
    drop(reader);

    let found = db.fetch_order_by_reference(&rrn(SAMPLE_RRN)).await.unwrap().expect("Reference should be stored");
    assert_eq!(found.id, order.id);
    tear_down(&mut db.clone()).await;
}

#[tokio::test]
async fn completed_order_is_visible_to_other_connections() {
    let (api, _) = setup().await;
    let db = api.db();
    let order = stuck_order(db, SAMPLE_RRN).await;
    let mut reader = db.pool().acquire().await.unwrap();

    let receipt = PayoutReceipt::new("sig-1", "ata-1");
    let completed = db.complete_order(order.id, &receipt).await.unwrap().expect("Order should complete");
    assert_eq!(completed.status, OrderStatusType::Completed);
    let stored = read_order(&mut reader, order.id).await;
    assert_eq!(stored.status, OrderStatusType::Completed);
    assert_eq!(stored.chain_tx_id.as_deref(), Some("sig-1"));
    assert_eq!(stored.recipient_account.as_deref(), Some("ata-1"));
    assert!(stored.completed_at.is_some());
    drop(reader);

    // Completion is conditional on PROCESSING and no transaction id
    let again = db.complete_order(order.id, &PayoutReceipt::new("sig-2", "ata-2")).await.unwrap();
    assert!(again.is_none());
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.chain_tx_id.as_deref(), Some("sig-1"));
    tear_down(&mut db.clone()).await;
}

#[tokio::test]
async fn attach_reference_only_applies_to_open_orders() {
    let (api, _) = setup().await;
    let db = api.db();
    let order = stuck_order(db, SAMPLE_RRN).await;
    let result = db.attach_reference(order.id, &rrn("123456789012")).await.unwrap();
    assert!(result.is_none());
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Processing);
    assert_eq!(order.reference_code.as_ref().map(|r| r.as_str()), Some(SAMPLE_RRN));
    tear_down(&mut db.clone()).await;
}

#[tokio::test]
async fn payout_signature_is_recorded_on_the_open_attempt() {
    let (api, _) = setup().await;
    let db = api.db();
    let order = stuck_order(db, SAMPLE_RRN).await;
    let attempt = db.record_payout_attempt(&order, MicroUsdc::from(6_020_000)).await.unwrap();
    db.record_payout_signature(attempt, "sig-1", "ata-1").await.unwrap();
    let stored = db.fetch_latest_payout_attempt(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PayoutStatusType::Submitted);
    assert_eq!(stored.signature.as_deref(), Some("sig-1"));
    assert_eq!(stored.recipient_account.as_deref(), Some("ata-1"));

    db.record_payout_failure(attempt, "rejected").await.unwrap();
    assert!(db.record_payout_signature(attempt, "sig-2", "ata-1").await.is_err());
    tear_down(&mut db.clone()).await;
}
