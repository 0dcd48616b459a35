//! Marketplace contract event decoding.
//!
//! The marketplace interface is declared with `sol!`, which gives us signature hashes and ABI decoders for every
//! event the contract can emit. [`EventDecoder`] matches a [`RawLog`] against that interface. Logs that match nothing,
//! or that were not emitted by the marketplace contract, are skipped. They are never errors: a shared log stream
//! carries plenty of events that are none of our business.
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolEventInterface};
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{EventName, NewEvent},
    helpers::{ipfs_hash::bytes32_to_ipfs_hash, to_checksum_address},
    network::NetworkContext,
};

sol! {
    interface IMarketplace {
        event MarketplaceData(address indexed party, bytes32 ipfsHash);
        event AffiliateAdded(address indexed party, bytes32 ipfsHash);
        event AffiliateRemoved(address indexed party, bytes32 ipfsHash);
        event ListingCreated(address indexed party, uint indexed listingID, bytes32 ipfsHash);
        event ListingUpdated(address indexed party, uint indexed listingID, bytes32 ipfsHash);
        event ListingWithdrawn(address indexed party, uint indexed listingID, bytes32 ipfsHash);
        event ListingArbitrated(address indexed party, uint indexed listingID, bytes32 ipfsHash);
        event ListingData(address indexed party, uint indexed listingID, bytes32 ipfsHash);
        event OfferCreated(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferAccepted(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferFinalized(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferWithdrawn(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferFundsAdded(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferDisputed(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
        event OfferRuled(
            address indexed party,
            uint indexed listingID,
            uint indexed offerID,
            bytes32 ipfsHash,
            uint ruling
        );
        event OfferData(address indexed party, uint indexed listingID, uint indexed offerID, bytes32 ipfsHash);
    }
}

use IMarketplace::IMarketplaceEvents as Ev;

/// A log entry as delivered by the chain listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub transaction_hash: B256,
    pub log_index: i64,
    pub block_number: i64,
    pub block_hash: B256,
    /// The block timestamp, if the listener supplied it
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The typed payload of a recognised marketplace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: EventName,
    /// Checksummed address of the account that triggered the event
    pub party: String,
    /// On-chain listing number
    pub listing_id: Option<i64>,
    /// On-chain offer sequence number within the listing
    pub offer_id: Option<i64>,
    /// The content hash as an IPFS CIDv0 string. `None` when the contract emitted an all-zero hash.
    pub ipfs_hash: Option<String>,
}

impl DecodedEvent {
    /// Combines the decoded payload with its raw log into a record ready to be stored.
    pub fn into_new_event(self, network_id: i64, contract_version: &str, log: &RawLog) -> NewEvent {
        NewEvent {
            network_id,
            contract_version: contract_version.to_string(),
            shop_id: None,
            event_name: self.name,
            listing_id: self.listing_id,
            offer_id: self.offer_id,
            party: self.party,
            ipfs_hash: self.ipfs_hash,
            address: to_checksum_address(&log.address),
            topics: log.topics.iter().map(|t| t.to_string()).collect(),
            data: log.data.to_string(),
            transaction_hash: log.transaction_hash.to_string(),
            log_index: log.log_index,
            block_number: log.block_number,
            block_hash: log.block_hash.to_string(),
            timestamp: log.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Stateless decoder for marketplace logs. The network context is supplied per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn decode(log: &RawLog, network: &NetworkContext, contract_version: &str) -> Option<DecodedEvent> {
        let Some(contract) = network.marketplace_contract(contract_version) else {
            warn!(
                "⛓️ No marketplace contract is configured for version {contract_version} on network {}. Skipping log \
                 {}:{}",
                network.network_id, log.transaction_hash, log.log_index
            );
            return None;
        };
        if log.address != contract {
            debug!(
                "⛓️ Log {}:{} was emitted by {}, not the marketplace contract {contract}. Skipping.",
                log.transaction_hash, log.log_index, log.address
            );
            return None;
        }
        let decoded = match Ev::decode_raw_log(log.topics.as_slice(), &log.data) {
            Ok(ev) => ev,
            Err(e) => {
                debug!("⛓️ Log {}:{} is not a known marketplace event. {e}", log.transaction_hash, log.log_index);
                return None;
            },
        };
        let event = Self::to_decoded_event(decoded);
        if event.is_none() {
            warn!("⛓️ Log {}:{} carries an id that does not fit in 64 bits. Skipping.", log.transaction_hash, log.log_index);
        }
        event
    }

    fn to_decoded_event(ev: Ev) -> Option<DecodedEvent> {
        let (name, party, listing, offer, hash) = match ev {
            Ev::MarketplaceData(e) => (EventName::MarketplaceData, e.party, None, None, e.ipfsHash),
            Ev::AffiliateAdded(e) => (EventName::AffiliateAdded, e.party, None, None, e.ipfsHash),
            Ev::AffiliateRemoved(e) => (EventName::AffiliateRemoved, e.party, None, None, e.ipfsHash),
            Ev::ListingCreated(e) => (EventName::ListingCreated, e.party, Some(e.listingID), None, e.ipfsHash),
            Ev::ListingUpdated(e) => (EventName::ListingUpdated, e.party, Some(e.listingID), None, e.ipfsHash),
            Ev::ListingWithdrawn(e) => (EventName::ListingWithdrawn, e.party, Some(e.listingID), None, e.ipfsHash),
            Ev::ListingArbitrated(e) => (EventName::ListingArbitrated, e.party, Some(e.listingID), None, e.ipfsHash),
            Ev::ListingData(e) => (EventName::ListingData, e.party, Some(e.listingID), None, e.ipfsHash),
            Ev::OfferCreated(e) => (EventName::OfferCreated, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash),
            Ev::OfferAccepted(e) => (EventName::OfferAccepted, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash),
            Ev::OfferFinalized(e) => {
                (EventName::OfferFinalized, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash)
            },
            Ev::OfferWithdrawn(e) => {
                (EventName::OfferWithdrawn, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash)
            },
            Ev::OfferFundsAdded(e) => {
                (EventName::OfferFundsAdded, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash)
            },
            Ev::OfferDisputed(e) => (EventName::OfferDisputed, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash),
            Ev::OfferRuled(e) => (EventName::OfferRuled, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash),
            Ev::OfferData(e) => (EventName::OfferData, e.party, Some(e.listingID), Some(e.offerID), e.ipfsHash),
        };
        let listing_id = match listing {
            Some(v) => Some(u256_to_i64(v)?),
            None => None,
        };
        let offer_id = match offer {
            Some(v) => Some(u256_to_i64(v)?),
            None => None,
        };
        Some(DecodedEvent {
            name,
            party: to_checksum_address(&party),
            listing_id,
            offer_id,
            ipfs_hash: bytes32_to_ipfs_hash(&hash),
        })
    }
}

fn u256_to_i64(value: U256) -> Option<i64> {
    u64::try_from(value).ok().and_then(|v| i64::try_from(v).ok())
}
