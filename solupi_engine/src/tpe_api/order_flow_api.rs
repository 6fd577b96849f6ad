use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{OrderManagement, OrderPage, OrderPageQuery, SettlementDatabase},
    db_types::{NewOrder, Order, OrderStatusType, ReferenceCode},
    helpers::is_valid_wallet_address,
    tpe_api::{
        errors::OrderFlowError,
        order_objects::AttachReferenceResult,
        settlement_api::SettlementApi,
        settlement_objects::SettlementReport,
    },
    traits::ChainPayout,
};

/// `OrderFlowApi` is the primary API for the user-facing order lifecycle: creating orders, reporting payments against
/// them, polling their status and cancelling them.
pub struct OrderFlowApi<B, P> {
    settlement: SettlementApi<B, P>,
}

impl<B, P> Debug for OrderFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, P> OrderFlowApi<B, P> {
    pub fn new(settlement: SettlementApi<B, P>) -> Self {
        Self { settlement }
    }

    pub fn db(&self) -> &B {
        self.settlement.db()
    }

    pub fn settlement(&self) -> &SettlementApi<B, P> {
        &self.settlement
    }
}

impl<B, P> OrderFlowApi<B, P>
where B: OrderManagement
{
    /// Creates a new `PENDING` order. The amount must be positive and the destination must look like a wallet
    /// address.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        if order.user_id.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("A user id is required".into()));
        }
        if !order.amount.is_positive() {
            return Err(OrderFlowError::ValidationError(format!("Order amount must be positive. Got {}", order.amount)));
        }
        if !is_valid_wallet_address(&order.destination_address) {
            return Err(OrderFlowError::ValidationError(format!(
                "'{}' is not a valid wallet address",
                order.destination_address
            )));
        }
        let order = self.db().insert_order(order).await?;
        info!("🔄️📦️ Order #{} for {} created for user {}", order.id, order.amount, order.user_id);
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db().fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    /// A page of the user's orders, newest first.
    pub async fn orders_for_user(&self, query: &OrderPageQuery) -> Result<OrderPage, OrderFlowError> {
        let page = self.db().fetch_orders_for_user(query).await?;
        trace!("🔄️📦️ Fetched {} of {} orders for user {}", page.orders.len(), page.total, query.user_id);
        Ok(page)
    }

    /// Cancels one of the user's orders. Orders that are being paid out, or have been, cannot be cancelled.
    pub async fn cancel_order(&self, order_id: i64, user_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_owned_order(order_id, user_id).await?;
        if !order.status.is_payable() {
            return Err(OrderFlowError::InvalidStatus { order_id, status: order.status });
        }
        if !self.db().transition_order_status(order_id, &OrderStatusType::PAYABLE, OrderStatusType::Cancelled).await? {
            let status = self.fetch_order(order_id).await?.status;
            return Err(OrderFlowError::InvalidStatus { order_id, status });
        }
        info!("🔄️📦️ Order #{order_id} cancelled by user {user_id}");
        self.fetch_order(order_id).await
    }

    async fn fetch_owned_order(&self, order_id: i64, user_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if order.user_id != user_id {
            return Err(OrderFlowError::NotOrderOwner(order_id));
        }
        Ok(order)
    }
}

impl<B, P> OrderFlowApi<B, P>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    /// Records the bank reference the user reports for their payment, then runs settlement for it.
    ///
    /// Attaching succeeds independently of the settlement outcome: if the payment has not been observed yet, the order
    /// waits in `AWAITING_PAYMENT` until the notification arrives.
    pub async fn attach_reference(
        &self,
        order_id: i64,
        reference: &str,
        user_id: &str,
    ) -> Result<AttachReferenceResult, OrderFlowError> {
        let reference = reference.parse::<ReferenceCode>().map_err(|e| OrderFlowError::ValidationError(e.to_string()))?;
        let order = self.fetch_owned_order(order_id, user_id).await?;
        if !order.status.is_payable() {
            return Err(OrderFlowError::InvalidStatus { order_id, status: order.status });
        }
        let attached = self.db().attach_reference(order_id, &reference).await?;
        if attached.is_none() {
            let status = self.fetch_order(order_id).await?.status;
            return Err(OrderFlowError::InvalidStatus { order_id, status });
        }
        info!("🔄️📦️ Reference {reference} attached to order #{order_id}");
        let result = self.settlement.settle(&reference).await;
        let settlement = SettlementReport::from(&result);
        let order = match result {
            Ok(outcome) => outcome.order().clone(),
            Err(_) => self.fetch_order(order_id).await?,
        };
        Ok(AttachReferenceResult { order, settlement })
    }
}
