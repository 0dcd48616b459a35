use std::fmt::Debug;

use log::*;

use crate::{
    contract::{DecodedEvent, EventDecoder, RawLog},
    db_types::{EventName, ListingId, OfferId},
    dshop_api::{
        errors::IngestError,
        outcomes::{IngestOutcome, ReconcileOutcome},
        reconciler::OrderReconciler,
    },
    helpers::OfferLocks,
    network::NetworkRegistry,
    traits::MarketplaceDatabase,
};

/// The entrypoint for raw marketplace logs.
///
/// Each log is decoded, recorded in the event store and then reconciled. Events for the same offer are processed one
/// at a time; events for different offers may be ingested concurrently from as many tasks as you like.
///
/// Ingestion is safe to repeat. A replayed log finds its stored copy and is reconciled again, which is a no-op for
/// anything that was fully applied the first time and finishes the job for anything that wasn't.
pub struct EventIngestor<B> {
    reconciler: OrderReconciler<B>,
    networks: NetworkRegistry,
    locks: OfferLocks,
}

impl<B> Debug for EventIngestor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventIngestor ({} networks)", self.networks.len())
    }
}

impl<B> EventIngestor<B> {
    pub fn new(reconciler: OrderReconciler<B>, networks: NetworkRegistry) -> Self {
        Self { reconciler, networks, locks: OfferLocks::new() }
    }

    pub fn reconciler(&self) -> &OrderReconciler<B> {
        &self.reconciler
    }

    pub fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }
}

impl<B> EventIngestor<B>
where B: MarketplaceDatabase
{
    pub async fn ingest(
        &self,
        network_id: i64,
        contract_version: &str,
        log: RawLog,
    ) -> Result<IngestOutcome, IngestError> {
        let network = self.networks.get(network_id).ok_or(IngestError::UnknownNetwork(network_id))?;
        if network.marketplace_contract(contract_version).is_none() {
            return Err(IngestError::UnknownContractVersion(network_id, contract_version.to_string()));
        }
        let Some(decoded) = EventDecoder::decode(&log, network, contract_version) else {
            return Ok(IngestOutcome::Skipped);
        };
        debug!("⛓️ {} event at {}:{} decoded", decoded.name, log.transaction_hash, log.log_index);
        let _guard = match lock_key(&decoded, network_id, contract_version) {
            Some(key) => Some(self.locks.lock(&key).await),
            None => None,
        };

        let db = self.reconciler.db();
        let shop = match decoded.listing_id {
            Some(n) if decoded.name != EventName::ListingCreated => {
                db.fetch_shop_by_listing_id(&ListingId::new(network_id, contract_version, n)).await?
            },
            _ => None,
        };
        let new_event =
            decoded.into_new_event(network_id, contract_version, &log).with_shop_id(shop.as_ref().map(|s| s.id));
        let recorded = db.record_event(new_event.clone()).await?;
        if !recorded.inserted {
            info!("⛓️ Event #{} is a replay. Reconciling it again.", recorded.event.id);
        }
        let outcome = self.reconciler.process_event(&recorded.event, shop, network).await?;
        let event = match &outcome {
            // The shop only exists for this event once the listing has been resolved
            ReconcileOutcome::ListingResolved { shop, .. } if recorded.event.shop_id.is_none() => {
                db.record_event(new_event.with_shop_id(Some(shop.id))).await?.event
            },
            _ => recorded.event,
        };
        Ok(IngestOutcome::Processed { event, newly_recorded: recorded.inserted, outcome })
    }
}

/// Offer events are serialized per offer. `ListingCreated` events are serialized per creator wallet, since they race
/// for that wallet's pending shops.
fn lock_key(event: &DecodedEvent, network_id: i64, contract_version: &str) -> Option<String> {
    match (event.name, event.listing_id, event.offer_id) {
        (EventName::ListingCreated, _, _) => Some(format!("wallet:{}", event.party.to_lowercase())),
        (name, Some(listing), Some(offer)) if name.is_offer_event() => {
            let listing_id = ListingId::new(network_id, contract_version, listing);
            Some(OfferId::new(&listing_id, offer).to_string())
        },
        _ => None,
    }
}
