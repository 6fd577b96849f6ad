use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderCompletedEvent, PayoutFailedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
    pub payout_failed_producer: Vec<EventProducer<PayoutFailedEvent>>,
}

pub struct EventHandlers {
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_payout_failed: Option<EventHandler<PayoutFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_failed = hooks.on_payout_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_completed, on_payout_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_failed {
            result.payout_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payout_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_payout_failed: Option<Handler<PayoutFailedEvent>>,
}

impl EventHooks {
    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn on_payout_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_failed = Some(Arc::new(f));
        self
    }
}
