use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use serde_json::{json, Value};
use solupi_common::Secret;
use solupi_engine::{
    db_types::{LedgerEntry, Order, OrderStatusType, Paise},
    events::EventProducers,
    IngestionApi,
    InsertLedgerResult,
    SettlementApi,
    SettlementConfig,
};

use super::{
    helpers::{sample_order, send_request},
    mocks::{MockStore, StubPayout},
};
use crate::{
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, WEBHOOK_SIGNATURE_HEADER},
    routes::EmailNotificationRoute,
};

const RELAY_SECRET: &str = "relay-secret";

const NOTIFICATION: &str = "Hi Naveen,\nYou have received ₹500 via UPI in your slice bank account xx6712!\nFrom\tKavya \
                            Sarsawat\nRRN\t570196198030\n";

fn webhook_routes(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let settlement =
            SettlementApi::new(store, StubPayout, SettlementConfig::default(), EventProducers::default());
        let hmac = HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(RELAY_SECRET.into()), true);
        cfg.app_data(web::Data::new(IngestionApi::new(settlement))).service(
            web::scope("/api").service(
                web::scope("/webhooks").wrap(hmac).service(EmailNotificationRoute::<MockStore, StubPayout>::new()),
            ),
        );
    }
}

async fn post_signed(body: &str, signature: Option<String>, store: MockStore) -> (StatusCode, Value) {
    let mut req = TestRequest::post()
        .uri("/api/webhooks/email-parse")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((WEBHOOK_SIGNATURE_HEADER, sig));
    }
    let (status, body) = send_request(req, webhook_routes(store)).await;
    (status, serde_json::from_str(&body).expect("Response is not JSON"))
}

/// Posts `body` signed with the relay secret.
async fn post_email(body: Value, store: MockStore) -> (StatusCode, Value) {
    let body = body.to_string();
    let signature = calculate_hmac(RELAY_SECRET, body.as_bytes());
    post_signed(&body, signature, store).await
}

#[actix_web::test]
async fn unsigned_notification_is_rejected() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let body = json!({"emailBody": NOTIFICATION}).to_string();
    let (status, body) = post_signed(&body, None, store).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No webhook signature found");
}

#[actix_web::test]
async fn forged_notification_is_rejected() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let body = json!({"emailBody": NOTIFICATION}).to_string();
    let forged = calculate_hmac("guessed-secret", body.as_bytes());
    let (status, response) = post_signed(&body, forged, store).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["error"], "Invalid webhook signature");

    // A valid signature for a different body does not carry over
    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let other = json!({"emailBody": "You have received ₹5 via UPI"}).to_string();
    let (status, _) = post_signed(&body, calculate_hmac(RELAY_SECRET, other.as_bytes()), store).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let (status, _) = post_signed(&body, Some("not base64".into()), store).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhook_without_a_configured_secret_rejects_everything() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let configure = move |cfg: &mut ServiceConfig| {
        let settlement =
            SettlementApi::new(store, StubPayout, SettlementConfig::default(), EventProducers::default());
        let hmac = HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::default(), true);
        cfg.app_data(web::Data::new(IngestionApi::new(settlement))).service(
            web::scope("/api").service(
                web::scope("/webhooks").wrap(hmac).service(EmailNotificationRoute::<MockStore, StubPayout>::new()),
            ),
        );
    };
    let body = json!({"emailBody": NOTIFICATION}).to_string();
    let req = TestRequest::post()
        .uri("/api/webhooks/email-parse")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, calculate_hmac("", body.as_bytes()).unwrap()))
        .set_payload(body);
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn awaiting_order() -> Order {
    let mut order = sample_order(3, OrderStatusType::AwaitingPayment);
    order.reference_code = Some("570196198030".parse().unwrap());
    order
}

#[actix_web::test]
async fn missing_email_body() {
    let (status, body) = post_email(json!({}), MockStore::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing 'emailBody' in request body");
    let (status, _) = post_email(json!({"emailBody": "   "}), MockStore::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unparseable_email() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(0);
    let (status, body) = post_email(json!({"emailBody": "Your monthly statement is ready"}), store).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Could not parse email");
}

#[actix_web::test]
async fn duplicate_notification() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(1).returning(|_| Ok(InsertLedgerResult::AlreadyExists(9)));
    let (status, body) = post_email(json!({"emailBody": NOTIFICATION}), store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ledger_id"], 9);
    assert_eq!(body["data"]["reference_code"], "570196198030");
    assert_eq!(body["data"]["inserted"], false);
    assert_eq!(body["data"]["settlement"], Value::Null);
}

#[actix_web::test]
async fn payment_without_an_order() {
    let mut store = MockStore::new();
    store
        .expect_store_entry()
        .withf(|e| e.reference_code.as_str() == "570196198030" && e.amount == Paise::from_rupees(500))
        .times(1)
        .returning(|_| Ok(InsertLedgerResult::Inserted(4)));
    store.expect_fetch_order_by_reference().times(1).returning(|_| Ok(None));
    let (status, body) = post_email(json!({"emailBody": NOTIFICATION}), store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["inserted"], true);
    assert_eq!(body["data"]["settlement"]["settled"], false);
    assert_eq!(body["data"]["settlement"]["kind"], "not_yet_available");
}

#[actix_web::test]
async fn payment_settles_waiting_order() {
    let mut store = MockStore::new();
    store.expect_store_entry().times(1).returning(|_| Ok(InsertLedgerResult::Inserted(4)));
    store.expect_fetch_order_by_reference().times(1).returning(|_| Ok(Some(awaiting_order())));
    store.expect_fetch_entry_by_reference().times(1).returning(|r| {
        Ok(Some(LedgerEntry {
            id: 4,
            reference_code: r.clone(),
            sender: "Kavya Sarsawat".into(),
            amount: Paise::from_rupees(500),
            observed_at: Utc::now(),
            used: false,
            created_at: Utc::now(),
        }))
    });
    store.expect_mark_used().withf(|id| *id == 4).times(1).returning(|_| Ok(true));
    store
        .expect_transition_order_status()
        .withf(|id, _, to| *id == 3 && *to == OrderStatusType::Processing)
        .times(1)
        .returning(|_, _, _| Ok(true));
    store.expect_record_payout_attempt().times(1).returning(|_, _| Ok(11));
    store
        .expect_record_payout_signature()
        .withf(|id, sig, account| *id == 11 && sig == "stub-signature" && account.starts_with("ata-"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    store
        .expect_record_payout_success()
        .withf(|id, r| *id == 11 && r.signature == "stub-signature")
        .times(1)
        .returning(|_, _| Ok(()));
    store.expect_complete_order().times(1).returning(|id, receipt| {
        let mut order = sample_order(id, OrderStatusType::Completed);
        order.chain_tx_id = Some(receipt.signature.clone());
        order.recipient_account = Some(receipt.recipient_account.clone());
        Ok(Some(order))
    });
    let (status, body) = post_email(json!({"emailBody": NOTIFICATION}), store).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["inserted"], true);
    assert_eq!(body["data"]["settlement"]["settled"], true);
    assert_eq!(body["data"]["settlement"]["kind"], Value::Null);
}
