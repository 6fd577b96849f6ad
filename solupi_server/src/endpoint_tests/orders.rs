use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::{json, Value};
use solupi_engine::{
    db_types::{Order, OrderStatusType},
    events::EventProducers,
    OrderFlowApi,
    OrderPage,
    SettlementApi,
    SettlementConfig,
    StoreError,
};

use super::{
    helpers::{get_request, json_request, sample_order, ALICE_WALLET},
    mocks::{MockStore, StubPayout},
};
use crate::routes::{AttachReferenceRoute, CancelOrderRoute, CreateOrderRoute, OrderByIdRoute, UserOrdersRoute};

fn order_routes(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let settlement =
            SettlementApi::new(store, StubPayout, SettlementConfig::default(), EventProducers::default());
        let api = OrderFlowApi::new(settlement);
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/api")
                .service(CreateOrderRoute::<MockStore, StubPayout>::new())
                .service(UserOrdersRoute::<MockStore, StubPayout>::new())
                .service(OrderByIdRoute::<MockStore, StubPayout>::new())
                .service(CancelOrderRoute::<MockStore, StubPayout>::new())
                .service(AttachReferenceRoute::<MockStore, StubPayout>::new()),
        );
    }
}

fn parse(body: &str) -> Value {
    serde_json::from_str(body).expect("Response is not JSON")
}

#[actix_web::test]
async fn create_order() {
    let mut store = MockStore::new();
    store.expect_insert_order().times(1).returning(|o| {
        let mut order = sample_order(1, OrderStatusType::Pending);
        order.user_id = o.user_id;
        order.amount = o.amount;
        Ok(order)
    });
    let body = json!({"userId": "bob", "amount": 750, "walletAddress": ALICE_WALLET});
    let (status, body) = json_request(TestRequest::post().uri("/api/orders"), body, order_routes(store)).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = parse(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["user_id"], "bob");
    assert_eq!(body["data"]["amount"], 750.0);
    assert_eq!(body["data"]["status"], "PENDING");
}

#[actix_web::test]
async fn create_order_with_zero_amount() {
    let store = MockStore::new();
    let body = json!({"userId": "bob", "amount": 0, "walletAddress": ALICE_WALLET});
    let (status, body) = json_request(TestRequest::post().uri("/api/orders"), body, order_routes(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"error":"Invalid request: Order amount must be positive. Got ₹0.00"}"#);
}

#[actix_web::test]
async fn create_order_with_bad_wallet() {
    let store = MockStore::new();
    let body = json!({"userId": "bob", "amount": 100, "walletAddress": "0xdeadbeef"});
    let (status, body) = json_request(TestRequest::post().uri("/api/orders"), body, order_routes(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"error":"Invalid request: '0xdeadbeef' is not a valid wallet address"}"#);
}

#[actix_web::test]
async fn create_order_with_missing_fields() {
    let store = MockStore::new();
    let body = json!({"userId": "bob"});
    let (status, body) = json_request(TestRequest::post().uri("/api/orders"), body, order_routes(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = parse(&body);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn fetch_order() {
    let mut store = MockStore::new();
    store.expect_fetch_order().withf(|id| *id == 7).returning(|id| Ok(Some(sample_order(id, OrderStatusType::Pending))));
    let (status, body) = get_request("/api/orders/7", order_routes(store)).await;
    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["data"]["id"], 7);
    assert_eq!(body["data"]["destination_address"], ALICE_WALLET);
    assert_eq!(body["data"]["reference_code"], Value::Null);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Ok(None));
    let (status, body) = get_request("/api/orders/42", order_routes(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"success":false,"error":"Order 42 does not exist"}"#);
}

#[actix_web::test]
async fn database_errors_are_not_leaked() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Err(StoreError::DatabaseError("disk I/O error in orders.db".into())));
    let (status, body) = get_request("/api/orders/42", order_routes(store)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("orders.db"));
    assert_eq!(body, r#"{"success":false,"error":"An internal error occurred. Please try again later."}"#);
}

#[actix_web::test]
async fn list_orders() {
    let mut store = MockStore::new();
    store
        .expect_fetch_orders_for_user()
        .withf(|q| q.user_id == "alice" && q.page == 2 && q.limit == 5 && q.status == Some(OrderStatusType::Pending))
        .times(1)
        .returning(|q| Ok(OrderPage::new(vec![sample_order(3, OrderStatusType::Pending)], 6, q)));
    let (status, body) =
        get_request("/api/orders?userId=alice&page=2&limit=5&status=PENDING", order_routes(store)).await;
    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["data"]["total"], 6);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn list_orders_needs_a_user() {
    let store = MockStore::new();
    let (status, body) = get_request("/api/orders?page=1", order_routes(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"error":"Missing required query parameter: userId"}"#);
}

#[actix_web::test]
async fn cancel_order() {
    let mut store = MockStore::new();
    let mut calls = 0;
    store.expect_fetch_order().times(2).returning(move |id| {
        calls += 1;
        let status = if calls == 1 { OrderStatusType::Pending } else { OrderStatusType::Cancelled };
        Ok(Some(sample_order(id, status)))
    });
    store
        .expect_transition_order_status()
        .withf(|id, from, to| *id == 1 && from.iter().eq(OrderStatusType::PAYABLE.iter()) && *to == OrderStatusType::Cancelled)
        .times(1)
        .returning(|_, _, _| Ok(true));
    let req = TestRequest::delete().uri("/api/orders/1");
    let (status, body) = json_request(req, json!({"userId": "alice"}), order_routes(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["data"]["status"], "CANCELLED");
}

#[actix_web::test]
async fn cancel_someone_elses_order() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, OrderStatusType::Pending))));
    let req = TestRequest::delete().uri("/api/orders/1");
    let (status, body) = json_request(req, json!({"userId": "mallory"}), order_routes(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"success":false,"error":"Order 1 does not belong to this user"}"#);
}

#[actix_web::test]
async fn cancel_completed_order() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, OrderStatusType::Completed))));
    let req = TestRequest::delete().uri("/api/orders/1");
    let (status, body) = json_request(req, json!({"userId": "alice"}), order_routes(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"success":false,"error":"Order 1 cannot be modified in status COMPLETED"}"#);
}

fn awaiting(id: i64) -> Order {
    let mut order = sample_order(id, OrderStatusType::AwaitingPayment);
    order.reference_code = Some("570196198030".parse().unwrap());
    order
}

#[actix_web::test]
async fn attach_reference_before_payment_arrives() {
    let mut store = MockStore::new();
    let mut calls = 0;
    store.expect_fetch_order().times(2).returning(move |id| {
        calls += 1;
        Ok(Some(if calls == 1 { sample_order(id, OrderStatusType::Pending) } else { awaiting(id) }))
    });
    store
        .expect_attach_reference()
        .withf(|id, r| *id == 1 && r.as_str() == "570196198030")
        .times(1)
        .returning(|id, _| Ok(Some(awaiting(id))));
    store.expect_fetch_order_by_reference().times(1).returning(|_| Ok(Some(awaiting(1))));
    store.expect_fetch_entry_by_reference().times(1).returning(|_| Ok(None));
    let req = TestRequest::put().uri("/api/orders/1/reference");
    let body = json!({"utrNumber": "570196198030", "userId": "alice"});
    let (status, body) = json_request(req, body, order_routes(store)).await;
    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["data"]["order"]["status"], "AWAITING_PAYMENT");
    assert_eq!(body["data"]["order"]["reference_code"], "570196198030");
    assert_eq!(body["data"]["settlement"]["settled"], false);
    assert_eq!(body["data"]["settlement"]["kind"], "not_yet_available");
}

#[actix_web::test]
async fn attach_malformed_reference() {
    let store = MockStore::new();
    let req = TestRequest::put().uri("/api/orders/1/reference");
    let body = json!({"referenceCode": "1234", "userId": "alice"});
    let (status, body) = json_request(req, body, order_routes(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"success":false,"error":"Invalid request: Reference code must be exactly 12 digits. Got '1234'"}"#
    );
}

#[actix_web::test]
async fn attach_reference_to_completed_order() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, OrderStatusType::Completed))));
    let req = TestRequest::put().uri("/api/orders/1/reference");
    let body = json!({"referenceCode": "570196198030", "userId": "alice"});
    let (status, _) = json_request(req, body, order_routes(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn attach_reference_that_is_already_taken() {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id, OrderStatusType::Pending))));
    store
        .expect_attach_reference()
        .returning(|_, r| Err(StoreError::DuplicateReference(r.clone())));
    let req = TestRequest::put().uri("/api/orders/1/reference");
    let body = json!({"referenceCode": "570196198030", "userId": "alice"});
    let (status, body) = json_request(req, body, order_routes(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"success":false,"error":"Reference code 570196198030 is already attached to another order"}"#
    );
}
