use log::*;

use crate::{
    db_types::{ListingId, StoredEvent},
    dshop_api::{
        errors::ReconcileError,
        outcomes::{ReconcileOutcome, SkipReason, StageOutcome},
        reconciler::OrderReconciler,
    },
    events::ListingResolvedEvent,
    network::NetworkContext,
    traits::MarketplaceDatabase,
};

impl<B> OrderReconciler<B>
where B: MarketplaceDatabase
{
    /// Links a new on-chain listing to the shop that its creator's wallet has waiting for it.
    ///
    /// The shop row is the source of truth. Patching the staged shop configuration is best-effort: if it fails the
    /// failure is reported in the outcome and the shop keeps its new listing id.
    pub(super) async fn resolve_listing(
        &self,
        event: &StoredEvent,
        network: &NetworkContext,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let listing_number = event
            .listing_id
            .ok_or_else(|| ReconcileError::MalformedEvent(event.event_name, "No listing id".into()))?;
        let listing_id = ListingId::new(network.network_id, &event.contract_version, listing_number);
        if let Some(owner) = self.db.fetch_shop_by_listing_id(&listing_id).await? {
            debug!("🏷️ Listing {listing_id} already belongs to shop #{}. Skipping.", owner.id);
            return Ok(ReconcileOutcome::Skipped(SkipReason::ListingAlreadyAssigned));
        }
        let Some(shop) = self.db.fetch_pending_shop_for_wallet(&event.party).await? else {
            info!("🏷️ Listing {listing_id} was created by {}, who has no pending shop. Skipping.", event.party);
            return Ok(ReconcileOutcome::Skipped(SkipReason::NoPendingShop));
        };
        let shop = self.db.assign_listing_id(shop.id, &listing_id).await?;
        info!("🏷️ Shop #{} ({}) is now listing {listing_id}", shop.id, shop.name);
        let config_patch =
            match self.collaborators.shop_configs.patch_listing_id(&shop, network.network_id, &listing_id).await {
                Ok(()) => StageOutcome::Succeeded,
                Err(e) => {
                    error!("🏷️ Could not write listing id {listing_id} to the config for shop #{}. {e}", shop.id);
                    StageOutcome::Failed(e.to_string())
                },
            };
        self.producers.publish_listing_resolved(ListingResolvedEvent::new(shop.clone())).await;
        Ok(ReconcileOutcome::ListingResolved { shop, config_patch })
    }
}
