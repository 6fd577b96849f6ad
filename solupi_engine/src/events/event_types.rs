use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Published after a payout has been confirmed and the order marked `COMPLETED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published when a transfer attempt fails and the order has been reverted for a later retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutFailedEvent {
    pub order: Order,
    pub reason: String,
    /// True if the failure needs an operator (e.g. the platform wallet is out of funds)
    pub needs_operator: bool,
}

impl PayoutFailedEvent {
    pub fn new<S: Into<String>>(order: Order, reason: S, needs_operator: bool) -> Self {
        Self { order, reason: reason.into(), needs_operator }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCompleted(OrderCompletedEvent),
    PayoutFailed(PayoutFailedEvent),
}
