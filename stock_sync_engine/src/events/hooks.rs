use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{AdjustmentFailedEvent, EventHandler, EventProducer, Handler, StockChangedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub stock_changed_producer: Vec<EventProducer<StockChangedEvent>>,
    pub adjustment_failed_producer: Vec<EventProducer<AdjustmentFailedEvent>>,
}

impl EventProducers {
    pub async fn publish_stock_changed(&self, event: StockChangedEvent) {
        for producer in &self.stock_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_adjustment_failed(&self, event: AdjustmentFailedEvent) {
        for producer in &self.adjustment_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_stock_changed: Option<EventHandler<StockChangedEvent>>,
    pub on_adjustment_failed: Option<EventHandler<AdjustmentFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_stock_changed = hooks.on_stock_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_adjustment_failed = hooks.on_adjustment_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_stock_changed, on_adjustment_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_stock_changed {
            result.stock_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_adjustment_failed {
            result.adjustment_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_stock_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_adjustment_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_stock_changed: Option<Handler<StockChangedEvent>>,
    pub on_adjustment_failed: Option<Handler<AdjustmentFailedEvent>>,
}

impl EventHooks {
    pub fn on_stock_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StockChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_stock_changed = Some(Arc::new(f));
        self
    }

    pub fn on_adjustment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AdjustmentFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_adjustment_failed = Some(Arc::new(f));
        self
    }
}
