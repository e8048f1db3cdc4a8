use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderReconciledEvent, ReviewRequiredEvent};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_reconciled_producer: Vec<EventProducer<OrderReconciledEvent>>,
    pub review_required_producer: Vec<EventProducer<ReviewRequiredEvent>>,
}

impl EventProducers {
    pub async fn order_reconciled(&self, event: OrderReconciledEvent) {
        for producer in &self.order_reconciled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn review_required(&self, event: ReviewRequiredEvent) {
        for producer in &self.review_required_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_reconciled: Option<EventHandler<OrderReconciledEvent>>,
    pub on_review_required: Option<EventHandler<ReviewRequiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_reconciled = hooks.on_order_reconciled.map(|f| EventHandler::new(buffer_size, f));
        let on_review_required = hooks.on_review_required.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_reconciled, on_review_required }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_reconciled {
            result.order_reconciled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_review_required {
            result.review_required_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_reconciled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_review_required {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_reconciled: Option<Handler<OrderReconciledEvent>>,
    pub on_review_required: Option<Handler<ReviewRequiredEvent>>,
}

impl EventHooks {
    pub fn on_order_reconciled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderReconciledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_reconciled = Some(Arc::new(f));
        self
    }

    pub fn on_review_required<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReviewRequiredEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_review_required = Some(Arc::new(f));
        self
    }
}
