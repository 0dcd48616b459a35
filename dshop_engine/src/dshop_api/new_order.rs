use chrono::Utc;
use log::*;
use serde::Deserialize;

use crate::{
    db_types::{NewOrder, OfferId, Order, OrderStatus, Shop, StoredEvent},
    dshop_api::{
        errors::ReconcileError,
        outcomes::{ReconcileOutcome, SideEffectReport, StageOutcome},
        reconciler::OrderReconciler,
    },
    events::OrderCreatedEvent,
    helpers::{normalize_address, referral_commission},
    network::NetworkContext,
    order_data::OrderData,
    shop_config::ShopConfig,
    traits::{CollaboratorError, DiscountValidation, MarketplaceDatabase},
};

/// The public document an offer's content hash points to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferDescriptor {
    #[serde(default)]
    encrypted_data: Option<String>,
    #[serde(default)]
    payment_code: Option<String>,
}

impl OfferDescriptor {
    fn parse(bytes: &[u8]) -> Result<Self, ReconcileError> {
        serde_json::from_slice(bytes).map_err(|e| ReconcileError::InvalidOfferDescriptor(e.to_string()))
    }
}

impl<B> OrderReconciler<B>
where B: MarketplaceDatabase
{
    /// Builds and stores the order for a brand-new offer.
    ///
    /// Every step up to and including the insert is required: if one fails, nothing is written and the event can be
    /// replayed. Fulfillment and notifications run after the insert and can only fail softly.
    pub(super) async fn create_order(
        &self,
        event: &StoredEvent,
        shop: &Shop,
        network: &NetworkContext,
        offer_id: OfferId,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let config = self.collaborators.shop_configs.load(shop).await?;
        let gateway = config.gateway_or(&network.ipfs_gateway);
        let ipfs_hash = event
            .ipfs_hash
            .as_deref()
            .ok_or_else(|| ReconcileError::MalformedEvent(event.event_name, "No offer content hash".into()))?;

        let descriptor = OfferDescriptor::parse(&self.fetch_content(gateway, ipfs_hash).await?)?;
        let encrypted_hash =
            descriptor.encrypted_data.filter(|s| !s.trim().is_empty()).ok_or(ReconcileError::NoEncryptedData)?;
        let mut data = self
            .collaborators
            .decryptor
            .decrypt(&config, gateway, &encrypted_hash)
            .await
            .map_err(|e| ReconcileError::DecryptionFailed(e.to_string()))?;
        data.offer_id = Some(offer_id.to_string());
        data.tx = Some(event.transaction_hash.clone());

        let referrer = self.resolve_referrer(&offer_id, &mut data);
        let commission_pending = referrer.as_ref().map(|_| referral_commission(data.sub_total));
        self.validate_discount(shop, &offer_id, &mut data).await;

        let new_order = NewOrder {
            network_id: network.network_id,
            shop_id: shop.id,
            order_id: offer_id,
            status: OrderStatus::OfferCreated,
            data,
            ipfs_hash: event.ipfs_hash.clone(),
            encrypted_ipfs_hash: Some(encrypted_hash),
            payment_code: descriptor.payment_code,
            referrer,
            commission_pending,
            block_number: event.block_number,
            log_index: event.log_index,
            created_at: Utc::now(),
        };
        let (order, inserted) = self.db.insert_order(new_order).await?;
        if !inserted {
            let reason = "The order already exists".to_string();
            warn!("🔄️📦️ Order {} was created by a concurrent worker. Skipping side effects.", order.order_id);
            return Ok(ReconcileOutcome::Ignored { order, reason });
        }
        info!("🔄️📦️ New order {} created for shop #{}", order.order_id, shop.id);

        let side_effects = self.run_side_effects(shop, &config, &order).await;
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        Ok(ReconcileOutcome::OrderCreated { order, side_effects })
    }

    async fn fetch_content(&self, gateway: &str, ipfs_hash: &str) -> Result<Vec<u8>, ReconcileError> {
        let timeout = self.config.content_fetch_timeout;
        match tokio::time::timeout(timeout, self.collaborators.content.fetch(gateway, ipfs_hash)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(ReconcileError::ContentFetchFailed(ipfs_hash.to_string(), e.to_string())),
            Err(_) => Err(ReconcileError::ContentFetchTimeout(ipfs_hash.to_string(), timeout)),
        }
    }

    /// Checksums the referrer in place. An unusable referrer is dropped and earns nothing.
    fn resolve_referrer(&self, offer_id: &OfferId, data: &mut OrderData) -> Option<String> {
        let raw = data.referrer.as_deref().map(str::trim).filter(|r| !r.is_empty())?.to_string();
        match normalize_address(&raw) {
            Some(address) => {
                data.referrer = Some(address.clone());
                Some(address)
            },
            None => {
                warn!("🔄️📦️ Order {offer_id} has an invalid referrer address ({raw}). No commission will be paid.");
                None
            },
        }
    }

    /// An invalid discount does not block the order; it is flagged on the payload for the merchant to deal with.
    async fn validate_discount(&self, shop: &Shop, offer_id: &OfferId, data: &mut OrderData) {
        match self.collaborators.discounts.validate(shop, data).await {
            Ok(DiscountValidation::Valid) => {},
            Ok(DiscountValidation::Invalid(reason)) => {
                info!("🔄️📦️ Order {offer_id} has an invalid discount. {reason}");
                data.error = Some(reason);
            },
            Err(e) => {
                warn!("🔄️📦️ Could not validate the discount for order {offer_id}. {e}");
                data.error = Some(e.to_string());
            },
        }
    }

    async fn run_side_effects(&self, shop: &Shop, config: &ShopConfig, order: &Order) -> SideEffectReport {
        let fulfillment = if config.auto_fulfill {
            stage_outcome("fulfillment", order, self.collaborators.fulfillment.fulfill(shop, order).await)
        } else {
            StageOutcome::Skipped("Auto-fulfillment is not enabled for this shop".into())
        };
        let email =
            stage_outcome("email", order, self.collaborators.notifier.send_new_order_email(shop, config, order).await);
        let webhook =
            stage_outcome("webhook", order, self.collaborators.notifier.post_new_order_summary(shop, config, order).await);
        SideEffectReport { fulfillment, email, webhook }
    }
}

fn stage_outcome(stage: &str, order: &Order, result: Result<(), CollaboratorError>) -> StageOutcome {
    match result {
        Ok(()) => {
            debug!("📣️ New order {} {stage} done", order.order_id);
            StageOutcome::Succeeded
        },
        Err(e) => {
            error!("📣️ New order {} {stage} failed. {e}", order.order_id);
            StageOutcome::Failed(e.to_string())
        },
    }
}
