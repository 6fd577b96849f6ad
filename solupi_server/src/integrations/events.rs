use log::*;
use solupi_engine::events::{EventHandlers, EventHooks, OrderCompletedEvent, PayoutFailedEvent};

pub const EVENT_BUFFER_SIZE: usize = 25;

/// Event handlers for the engine's notifications.
///
/// There are no downstream consumers yet, so the handlers record the events in the log. Payout failures that need an
/// operator are logged at `error` level so that they can be alerted on.
pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_completed(|ev| {
        Box::pin(async move {
            let OrderCompletedEvent { order } = ev;
            info!(
                "📬️ Order {} completed. {} paid out to {}. Tx: {}",
                order.id,
                order.amount,
                order.destination_address,
                order.chain_tx_id.as_deref().unwrap_or("unknown")
            );
        })
    });
    hooks.on_payout_failed(|ev| {
        Box::pin(async move {
            let PayoutFailedEvent { order, reason, needs_operator } = ev;
            if needs_operator {
                error!("📬️ Payout for order {} failed and needs operator attention. {reason}", order.id);
            } else {
                warn!("📬️ Payout for order {} failed. It will be retried on the next trigger. {reason}", order.id);
            }
        })
    });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
