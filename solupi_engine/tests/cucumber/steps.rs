use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use solupi_engine::{
    db_types::{NewOrder, OrderStatusType, Paise},
    traits::PayoutError,
    LedgerManagement,
    OrderManagement,
};

use crate::{
    cucumber::SettlementWorld,
    support::{age_order, rrn, slice_email, ALICE_WALLET},
};

#[when(expr = "{word} places order {word} for ₹{word}")]
async fn place_order(world: &mut SettlementWorld, user: String, label: String, amount: String) {
    let amount = Paise::from_str(&amount).expect("Invalid amount");
    let order = NewOrder::new(user, amount, ALICE_WALLET);
    let order = world.system().orders.create_order(order).await.expect("Error creating order");
    world.system_mut().labels.insert(label, order.id);
}

#[when(expr = "{word} attaches reference {word} to order {word}")]
async fn attach_reference(world: &mut SettlementWorld, user: String, reference: String, label: String) {
    let id = world.order_id(&label);
    let _res = world.system().orders.attach_reference(id, &reference, &user).await.expect("Error attaching reference");
}

#[when(expr = "{word} cancels order {word}")]
async fn cancel_order(world: &mut SettlementWorld, user: String, label: String) {
    let id = world.order_id(&label);
    world.system().orders.cancel_order(id, &user).await.expect("Error cancelling order");
}

#[when(expr = "the bank reports ₹{word} received with reference {word}")]
async fn bank_notification(world: &mut SettlementWorld, amount: String, reference: String) {
    let body = slice_email(&amount, &reference);
    let _res = world.system().ingestion.submit_notification(&body).await.expect("Error ingesting notification");
}

#[when(expr = "the payout rail is down")]
async fn payout_down(world: &mut SettlementWorld) {
    world.system().payout.fail_with(PayoutError::Network("RPC node unreachable".into()));
}

#[when(expr = "the payout rail recovers")]
async fn payout_up(world: &mut SettlementWorld) {
    world.system().payout.succeed();
}

#[when(expr = "order {word} has been processing for an hour")]
async fn stuck_processing(world: &mut SettlementWorld, label: String) {
    let id = world.order_id(&label);
    let db = world.system().db();
    let claimed = db
        .transition_order_status(id, &OrderStatusType::PAYABLE, OrderStatusType::Processing)
        .await
        .expect("Error claiming order");
    assert!(claimed, "Order {label} could not be claimed");
    age_order(db, id).await;
}

#[when(expr = "reconciliation runs")]
async fn reconcile(world: &mut SettlementWorld) {
    let _res = world
        .system()
        .reconciliation
        .reconcile_stale_orders(Duration::from_secs(60))
        .await
        .expect("Error running reconciliation");
}

#[then(expr = "order {word} is {word}")]
async fn check_order_status(world: &mut SettlementWorld, label: String, status: String) {
    let id = world.order_id(&label);
    let expected = OrderStatusType::from_str(&status).expect("Invalid order status");
    let order = world.system().orders.fetch_order(id).await.expect("Error fetching order");
    assert_eq!(order.status, expected, "Order {label} is {}, expected {expected}", order.status);
    if expected == OrderStatusType::Completed {
        assert!(order.chain_tx_id.is_some(), "Completed order {label} has no transaction id");
    }
}

#[then(expr = "{int} payout(s) have/has been made")]
async fn check_payouts(world: &mut SettlementWorld, count: usize) {
    assert_eq!(world.system().payout.transfers(), count);
}

#[then(expr = "the payment with reference {word} is {word}")]
async fn check_ledger_entry(world: &mut SettlementWorld, reference: String, state: String) {
    let entry = world
        .system()
        .db()
        .fetch_entry_by_reference(&rrn(&reference))
        .await
        .expect("Error fetching ledger entry")
        .expect("No ledger entry for reference");
    match state.as_str() {
        "used" => assert!(entry.used, "Payment {reference} is unused"),
        "unused" => assert!(!entry.used, "Payment {reference} has been used"),
        s => panic!("Unknown ledger state {s}"),
    }
}
