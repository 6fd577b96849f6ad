use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use serde_json::Value;
use solupi_engine::db_types::{Order, OrderStatusType, Paise};

use crate::server::configure_extractors;

pub const ALICE_WALLET: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr";

/// Sends `req` to an app that is set up by `configure` and returns the status and body of the response.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let app = App::new().configure(configure_extractors).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    // Middleware rejections come back as errors rather than responses
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.map_into_boxed_body().into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), configure).await
}

pub async fn json_request<F>(req: TestRequest, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(req.set_json(body), configure).await
}

pub fn sample_order(id: i64, status: OrderStatusType) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 6, 10, 4, 45, 0).unwrap();
    Order {
        id,
        user_id: "alice".into(),
        amount: Paise::from_rupees(500),
        destination_address: ALICE_WALLET.into(),
        status,
        reference_code: None,
        chain_tx_id: None,
        recipient_account: None,
        created_at: ts,
        updated_at: ts,
        completed_at: None,
    }
}
