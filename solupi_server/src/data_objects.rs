use serde::{Deserialize, Serialize};
use solupi_engine::{
    db_types::{NewOrder, OrderStatusType, Paise},
    OrderPageQuery,
};

/// The envelope for every JSON response the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> JsonResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: String,
    /// Amount in rupees. Accepts numbers and numeric strings.
    pub amount: Paise,
    pub wallet_address: String,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        NewOrder::new(req.user_id, req.amount, req.wallet_address)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachReferenceRequest {
    #[serde(alias = "utrNumber", alias = "utr")]
    pub reference_code: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersQuery {
    #[serde(default, alias = "userId")]
    pub user_id: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatusType>,
}

impl From<OrdersQuery> for OrderPageQuery {
    fn from(q: OrdersQuery) -> Self {
        let query = OrderPageQuery::new(q.user_id)
            .with_page(q.page.unwrap_or(1), q.limit.unwrap_or(OrderPageQuery::DEFAULT_LIMIT));
        match q.status {
            Some(status) => query.with_status(status),
            None => query,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    #[serde(default)]
    pub email_body: Option<String>,
}
