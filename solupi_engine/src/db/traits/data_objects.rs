use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertLedgerResult {
    Inserted(i64),
    AlreadyExists(i64),
}

impl InsertLedgerResult {
    pub fn id(&self) -> i64 {
        match self {
            InsertLedgerResult::Inserted(id) | InsertLedgerResult::AlreadyExists(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertLedgerResult::Inserted(_))
    }
}

/// A page request for a user's orders. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPageQuery {
    pub user_id: String,
    pub status: Option<OrderStatusType>,
    pub page: u32,
    pub limit: u32,
}

impl OrderPageQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), status: None, page: 1, limit: Self::DEFAULT_LIMIT }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page.max(1);
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl OrderPage {
    pub fn new(orders: Vec<Order>, total: i64, query: &OrderPageQuery) -> Self {
        let limit = i64::from(query.limit.max(1));
        let total_pages = (total + limit - 1) / limit;
        Self { orders, total, page: query.page, limit: query.limit, total_pages }
    }
}
