//! What happened to an event. Every variant is a normal result; failures are [`ReconcileError`]s.
//!
//! [`ReconcileError`]: crate::ReconcileError
use std::fmt::Display;

use crate::db_types::{Order, Shop, StoredEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A listing was created, but no shop was waiting for one from that wallet
    NoPendingShop,
    /// The listing id in the event is already assigned to a shop
    ListingAlreadyAssigned,
    /// Listing, affiliate and marketplace events other than `ListingCreated`
    NotOfferEvent,
    /// An offer event on a listing that doesn't belong to any of our shops
    UnassociatedShop,
    /// Offer events that are not part of the order lifecycle, e.g. disputes
    UnhandledOfferEvent,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoPendingShop => write!(f, "no pending shop for the listing wallet"),
            SkipReason::ListingAlreadyAssigned => write!(f, "the listing is already assigned to a shop"),
            SkipReason::NotOfferEvent => write!(f, "not an offer event"),
            SkipReason::UnassociatedShop => write!(f, "the listing does not belong to a known shop"),
            SkipReason::UnhandledOfferEvent => write!(f, "the offer event does not affect order status"),
        }
    }
}

/// The result of a best-effort step. A failure here never undoes or blocks the transition it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded,
    Skipped(String),
    Failed(String),
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// The best-effort side effects of creating an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectReport {
    pub fulfillment: StageOutcome,
    pub email: StageOutcome,
    pub webhook: StageOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded,
    /// The refund was attempted and failed. The reason is stored in the order's `refundError`.
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    ListingResolved { shop: Shop, config_patch: StageOutcome },
    OrderCreated { order: Order, side_effects: SideEffectReport },
    OrderUpdated { order: Order, refund: Option<RefundOutcome> },
    /// The event refers to an existing order but was not applied, e.g. because it is stale
    Ignored { order: Order, reason: String },
}

impl ReconcileOutcome {
    /// The order the event created or touched, if any.
    pub fn order(&self) -> Option<&Order> {
        match self {
            ReconcileOutcome::OrderCreated { order, .. } |
            ReconcileOutcome::OrderUpdated { order, .. } |
            ReconcileOutcome::Ignored { order, .. } => Some(order),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The log is not a marketplace event we recognise
    Skipped,
    Processed {
        event: StoredEvent,
        /// False if the event had been recorded before, i.e. this is a replay
        newly_recorded: bool,
        outcome: ReconcileOutcome,
    },
}

impl IngestOutcome {
    pub fn reconcile_outcome(&self) -> Option<&ReconcileOutcome> {
        match self {
            IngestOutcome::Skipped => None,
            IngestOutcome::Processed { outcome, .. } => Some(outcome),
        }
    }
}
