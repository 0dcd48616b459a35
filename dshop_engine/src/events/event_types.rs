use serde::Serialize;

use crate::db_types::{Order, OrderStatus, Shop};

/// Published after a new order has been persisted and its side effects have run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after an offer event has moved an existing order to a new status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdatedEvent {
    pub old_status: OrderStatus,
    pub order: Order,
}

impl OrderUpdatedEvent {
    pub fn new(old_status: OrderStatus, order: Order) -> Self {
        Self { old_status, order }
    }
}

/// Published after a pending shop has been matched with its on-chain listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingResolvedEvent {
    pub shop: Shop,
}

impl ListingResolvedEvent {
    pub fn new(shop: Shop) -> Self {
        Self { shop }
    }
}

