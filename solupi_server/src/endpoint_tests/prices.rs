use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::Value;
use solupi_engine::{traits::PriceOracleError, PriceOracle};

use super::{helpers::get_request, mocks::MockRates};
use crate::routes::{health, PricesRoute};

fn price_routes(rates: MockRates) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(PriceOracle::new(rates).with_markup(2.0)))
            .service(health)
            .service(web::scope("/api").service(PricesRoute::<MockRates>::new()));
    }
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = get_request("/health", price_routes(MockRates::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn marked_up_quote() {
    let mut rates = MockRates::new();
    rates.expect_fetch_usd_inr().times(1).returning(|| Ok(85.0));
    let (status, body) = get_request("/api/prices", price_routes(rates)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["rawRate"], 85.0);
    assert_eq!(body["data"]["markupRate"], 2.0);
    assert_eq!(body["data"]["finalRate"], 86.7);
    assert_eq!(body["data"]["isFallback"], false);
}

#[actix_web::test]
async fn fallback_quote() {
    let mut rates = MockRates::new();
    rates.expect_fetch_usd_inr().times(1).returning(|| Err(PriceOracleError::UpstreamStatus(502)));
    let (status, body) = get_request("/api/prices", price_routes(rates)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["finalRate"], 93.0);
    assert_eq!(body["data"]["isFallback"], true);
}
