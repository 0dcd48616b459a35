use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, ListingResolvedEvent, OrderCreatedEvent, OrderUpdatedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_updated_producer: Vec<EventProducer<OrderUpdatedEvent>>,
    pub listing_resolved_producer: Vec<EventProducer<ListingResolvedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_updated(&self, event: OrderUpdatedEvent) {
        for producer in &self.order_updated_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_listing_resolved(&self, event: ListingResolvedEvent) {
        for producer in &self.listing_resolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_updated: Option<EventHandler<OrderUpdatedEvent>>,
    pub on_listing_resolved: Option<EventHandler<ListingResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_order_updated = hooks.on_order_updated.map(|f| EventHandler::new(buffer_size, f));
        let on_listing_resolved = hooks.on_listing_resolved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_order_updated, on_listing_resolved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_updated {
            result.order_updated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_listing_resolved {
            result.listing_resolved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_updated {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_listing_resolved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_updated: Option<Handler<OrderUpdatedEvent>>,
    pub on_listing_resolved: Option<Handler<ListingResolvedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_updated = Some(Arc::new(f));
        self
    }

    pub fn on_listing_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ListingResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_listing_resolved = Some(Arc::new(f));
        self
    }
}
