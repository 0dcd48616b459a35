use std::fmt::Debug;

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{EventName, OfferId, Order, OrderStatus, OrderUpdate, Shop, StoredEvent},
    dshop_api::{
        errors::ReconcileError,
        outcomes::{ReconcileOutcome, RefundOutcome, SkipReason},
    },
    events::{EventProducers, OrderUpdatedEvent},
    network::NetworkContext,
    traits::{Collaborators, MarketplaceDatabase, RefundResult},
};

/// `OrderReconciler` is the order state machine. It applies stored marketplace events to the order store and runs
/// the side effects that go with each transition.
///
/// The reconciler is stateless between calls: everything it needs about the network comes in with the event.
/// It does not serialize work itself. Callers that process events concurrently must make sure events for the same
/// offer don't overlap, which is what [`EventIngestor`](crate::EventIngestor) does.
pub struct OrderReconciler<B> {
    pub(super) db: B,
    pub(super) collaborators: Collaborators,
    pub(super) config: EngineConfig,
    pub(super) producers: EventProducers,
}

impl<B> Debug for OrderReconciler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReconciler ({:?})", self.config)
    }
}

impl<B> OrderReconciler<B> {
    pub fn new(db: B, collaborators: Collaborators, config: EngineConfig) -> Self {
        Self { db, collaborators, config, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<B> OrderReconciler<B>
where B: MarketplaceDatabase
{
    /// Applies a stored event.
    ///
    /// `shop` is the shop that owns the event's listing, if there is one. `ListingCreated` events ignore it and look
    /// for a pending shop instead.
    pub async fn process_event(
        &self,
        event: &StoredEvent,
        shop: Option<Shop>,
        network: &NetworkContext,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        trace!("🔄️📦️ Processing {} event #{} at {:?}", event.event_name, event.id, event.position());
        match event.event_name {
            EventName::ListingCreated => self.resolve_listing(event, network).await,
            EventName::ListingUpdated |
            EventName::ListingWithdrawn |
            EventName::ListingArbitrated |
            EventName::ListingData |
            EventName::AffiliateAdded |
            EventName::AffiliateRemoved |
            EventName::MarketplaceData => {
                debug!("🔄️📦️ {} event #{} is not offer related. Skipping.", event.event_name, event.id);
                Ok(ReconcileOutcome::Skipped(SkipReason::NotOfferEvent))
            },
            EventName::OfferFundsAdded | EventName::OfferDisputed | EventName::OfferRuled | EventName::OfferData => {
                debug!("🔄️📦️ {} event #{} does not change order status. Skipping.", event.event_name, event.id);
                Ok(ReconcileOutcome::Skipped(SkipReason::UnhandledOfferEvent))
            },
            EventName::OfferCreated |
            EventName::OfferAccepted |
            EventName::OfferFinalized |
            EventName::OfferWithdrawn => self.process_offer_event(event, shop, network).await,
        }
    }

    async fn process_offer_event(
        &self,
        event: &StoredEvent,
        shop: Option<Shop>,
        network: &NetworkContext,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(shop) = shop else {
            info!(
                "🔄️📦️ {} event #{} (listing {:?}) is not associated with any shop. Skipping.",
                event.event_name, event.id, event.listing_id
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnassociatedShop));
        };
        let listing_id = shop.listing_id.clone().ok_or(ReconcileError::ShopMissingListingId(shop.id))?;
        let offer_number = event
            .offer_id
            .ok_or_else(|| ReconcileError::MalformedEvent(event.event_name, "No offer id".into()))?;
        let next_status = OrderStatus::from_event(event.event_name)
            .ok_or_else(|| ReconcileError::MalformedEvent(event.event_name, "Not an order lifecycle event".into()))?;
        let offer_id = OfferId::new(&listing_id, offer_number);
        match self.db.fetch_order(network.network_id, shop.id, &offer_id).await? {
            None if next_status == OrderStatus::OfferCreated => {
                self.create_order(event, &shop, network, offer_id).await
            },
            None => {
                warn!("🔄️📦️ {} event #{} refers to order {offer_id}, which does not exist", event.event_name, event.id);
                Err(ReconcileError::OrderNotFound(offer_id, event.event_name))
            },
            Some(order) => self.transition_order(event, &shop, order, next_status).await,
        }
    }

    async fn transition_order(
        &self,
        event: &StoredEvent,
        shop: &Shop,
        order: Order,
        next_status: OrderStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if self.config.enforce_event_ordering {
            if event.position() <= order.position() {
                let reason = format!(
                    "{} event at {:?} is not newer than the last event applied to the order, at {:?}",
                    event.event_name,
                    event.position(),
                    order.position()
                );
                debug!("🔄️📦️ Order {}: {reason}. Ignoring.", order.order_id);
                return Ok(ReconcileOutcome::Ignored { order, reason });
            }
            if order.status.is_terminal() {
                let reason = format!("the order is already {} and cannot move to {next_status}", order.status);
                info!("🔄️📦️ Order {}: {reason}. Ignoring.", order.order_id);
                return Ok(ReconcileOutcome::Ignored { order, reason });
            }
            if !order.status.can_transition_to(next_status) {
                let reason = format!("{} -> {next_status} is not a forward transition", order.status);
                warn!("🔄️📦️ Order {}: {reason}. Ignoring.", order.order_id);
                return Ok(ReconcileOutcome::Ignored { order, reason });
            }
        }
        let old_status = order.status;
        let mut update = OrderUpdate::default().with_status(next_status).at_position(event.block_number, event.log_index);
        let mut refund = None;
        if next_status == OrderStatus::OfferWithdrawn && self.is_refundable(&order) {
            let outcome = self.refund_order(shop, &order).await?;
            let mut data = order.data.clone();
            data.refund_error = match &outcome {
                RefundOutcome::Refunded => None,
                RefundOutcome::Failed(reason) => Some(reason.clone()),
            };
            update = update.with_data(data);
            refund = Some(outcome);
        }
        let order = self.db.update_order(order.id, update).await?;
        info!("🔄️📦️ Order {} moved from {old_status} to {}", order.order_id, order.status);
        self.producers.publish_order_updated(OrderUpdatedEvent::new(old_status, order.clone())).await;
        Ok(ReconcileOutcome::OrderUpdated { order, refund })
    }

    fn is_refundable(&self, order: &Order) -> bool {
        order.data.payment_method_id().map(|m| self.config.is_refundable(m)).unwrap_or(false)
    }

    /// Refunds the external payment behind the order.
    ///
    /// Not being able to find the payment is fatal. The refund itself failing is not: it is reported so that the
    /// reason can be stored on the order, and the withdrawal goes ahead regardless.
    async fn refund_order(&self, shop: &Shop, order: &Order) -> Result<RefundOutcome, ReconcileError> {
        let missing = |reason: &str| ReconcileError::MissingExternalPayment(order.order_id.clone(), reason.into());
        let code = order.payment_code.as_deref().ok_or_else(|| missing("The order has no payment code"))?;
        let payment = self
            .db
            .fetch_external_payment(code)
            .await?
            .ok_or_else(|| missing("No external payment exists for the payment code"))?;
        if payment.payment_reference.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(missing("The external payment has no payment reference"));
        }
        let config = self.collaborators.shop_configs.load(shop).await?;
        let key = refund_idempotency_key(order);
        let outcome = match self.collaborators.refunds.refund(&config, &payment, &key).await {
            Ok(RefundResult::Refunded) => {
                info!("💸️ Order {} has been refunded via {}", order.order_id, payment.provider);
                RefundOutcome::Refunded
            },
            Ok(RefundResult::Declined(reason)) => {
                warn!("💸️ The refund for order {} was declined. {reason}", order.order_id);
                RefundOutcome::Failed(reason)
            },
            Err(e) => {
                warn!("💸️ The refund for order {} failed. {e}", order.order_id);
                RefundOutcome::Failed(e.to_string())
            },
        };
        Ok(outcome)
    }
}

/// The key the refund gateway uses to recognise repeated refund requests for the same order.
pub fn refund_idempotency_key(order: &Order) -> String {
    format!("refund-{}", order.order_id)
}
