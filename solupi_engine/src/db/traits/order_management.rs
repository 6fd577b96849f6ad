use std::time::Duration;

use crate::{
    db::traits::{OrderPage, OrderPageQuery, StoreError},
    db_types::{NewOrder, Order, OrderStatusType, PayoutReceipt, ReferenceCode},
};

/// Durable storage for purchase orders.
///
/// Every method that changes an order's status is conditional on the current status, and reports whether it took
/// effect. Callers must treat a `false`/`None` result as "somebody else got there first".
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order in the `PENDING` state and returns it.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_reference(&self, reference: &ReferenceCode) -> Result<Option<Order>, StoreError>;

    /// Returns the requested page of a user's orders, newest first.
    async fn fetch_orders_for_user(&self, query: &OrderPageQuery) -> Result<OrderPage, StoreError>;

    /// Attaches the payment reference to an order that is still payable, moving it to `AWAITING_PAYMENT`.
    /// Returns `None` if the order is no longer payable. If another order already carries the reference,
    /// [`StoreError::DuplicateReference`] is returned.
    async fn attach_reference(&self, id: i64, reference: &ReferenceCode) -> Result<Option<Order>, StoreError>;

    /// Moves the order to `to` if, and only if, its current status is one of `from`. Returns true if the row was
    /// updated.
    async fn transition_order_status(
        &self,
        id: i64,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<bool, StoreError>;

    /// Records the payout on a `PROCESSING` order that has no transaction id yet and marks it `COMPLETED`.
    /// Returns `None` if those conditions do not hold.
    async fn complete_order(&self, id: i64, receipt: &PayoutReceipt) -> Result<Option<Order>, StoreError>;

    /// Forces every `PROCESSING` order carrying the reference back to `PENDING`. Returns the number of orders
    /// released.
    async fn release_processing_orders(&self, reference: &ReferenceCode) -> Result<u64, StoreError>;

    /// Orders that have been in `status` for longer than `older_than`.
    async fn fetch_stale_orders(
        &self,
        status: OrderStatusType,
        older_than: Duration,
    ) -> Result<Vec<Order>, StoreError>;
}
