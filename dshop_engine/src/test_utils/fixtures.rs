//! Canned networks, shops, logs and order payloads for tests.
use alloy_primitives::{address, Address, B256, U256};
use alloy_sol_types::SolEvent;
use dshop_common::MinorUnits;
use serde_json::json;

use crate::{
    contract::{IMarketplace, RawLog},
    db_types::NewShop,
    helpers::ipfs_hash::bytes32_to_ipfs_hash,
    network::{NetworkContext, NetworkRegistry},
    order_data::{OrderData, OrderItem, PaymentMethod},
};

pub const NETWORK_ID: i64 = 999;
pub const CONTRACT_VERSION: &str = "001";
pub const GATEWAY: &str = "https://ipfs.example.com";
pub const MARKETPLACE: Address = address!("698ff47b84837d3971118a369c570172ee7e54c2");
pub const SELLER: Address = address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
pub const BUYER: Address = address!("fb6916095ca1df60bb79ce92ce3ea74c37c5d359");
pub const REFERRER: &str = "0xdbf03b407c01e7cd3cbea99509d93f8dddc8c6fb";

pub fn network() -> NetworkContext {
    NetworkContext::new(NETWORK_ID, GATEWAY).with_marketplace_contract(CONTRACT_VERSION, MARKETPLACE)
}

pub fn registry() -> NetworkRegistry {
    NetworkRegistry::new().with_network(network())
}

/// A shop owned by `SELLER` that is waiting for its listing to be created.
pub fn pending_shop(name: &str) -> NewShop {
    NewShop::new(name.to_string(), SELLER.to_string(), format!("shops/{name}")).with_config(
        json!({
            "email": format!("{name}@example.com"),
            "discordWebhook": "https://discord.example.com/hook",
            "publicUrl": format!("https://{name}.example.com")
        })
        .to_string(),
    )
}

/// Deterministic transaction hash for a log position.
pub fn tx_hash(block_number: i64, log_index: i64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block_number.to_be_bytes());
    bytes[24..].copy_from_slice(&log_index.to_be_bytes());
    B256::from(bytes)
}

pub fn content_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

/// The CIDv0 form of [`content_hash`]
pub fn ipfs(n: u8) -> String {
    bytes32_to_ipfs_hash(&content_hash(n)).unwrap_or_default()
}

pub fn raw_log<E: SolEvent>(event: &E, block_number: i64, log_index: i64) -> RawLog {
    let data = event.encode_log_data();
    RawLog {
        address: MARKETPLACE,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
        transaction_hash: tx_hash(block_number, log_index),
        log_index,
        block_number,
        block_hash: B256::repeat_byte(0xbb),
        timestamp: None,
    }
}

pub fn listing_created_log(creator: Address, listing: u64, block_number: i64, log_index: i64) -> RawLog {
    let event = IMarketplace::ListingCreated {
        party: creator,
        listingID: U256::from(listing),
        ipfsHash: content_hash(0x11),
    };
    raw_log(&event, block_number, log_index)
}

/// The lifecycle offer events, keyed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferEvent {
    Created,
    Accepted,
    Finalized,
    Withdrawn,
    Disputed,
}

pub fn offer_log(kind: OfferEvent, listing: u64, offer: u64, hash: u8, block_number: i64, log_index: i64) -> RawLog {
    let party = BUYER;
    let listing_id = U256::from(listing);
    let offer_id = U256::from(offer);
    let ipfs_hash = content_hash(hash);
    match kind {
        OfferEvent::Created => raw_log(
            &IMarketplace::OfferCreated { party, listingID: listing_id, offerID: offer_id, ipfsHash: ipfs_hash },
            block_number,
            log_index,
        ),
        OfferEvent::Accepted => raw_log(
            &IMarketplace::OfferAccepted { party, listingID: listing_id, offerID: offer_id, ipfsHash: ipfs_hash },
            block_number,
            log_index,
        ),
        OfferEvent::Finalized => raw_log(
            &IMarketplace::OfferFinalized { party, listingID: listing_id, offerID: offer_id, ipfsHash: ipfs_hash },
            block_number,
            log_index,
        ),
        OfferEvent::Withdrawn => raw_log(
            &IMarketplace::OfferWithdrawn { party, listingID: listing_id, offerID: offer_id, ipfsHash: ipfs_hash },
            block_number,
            log_index,
        ),
        OfferEvent::Disputed => raw_log(
            &IMarketplace::OfferDisputed { party, listingID: listing_id, offerID: offer_id, ipfsHash: ipfs_hash },
            block_number,
            log_index,
        ),
    }
}

/// A decrypted order payload with a single item.
pub fn order_payload(sub_total: i64, payment_method: &str) -> OrderData {
    OrderData {
        items: vec![OrderItem {
            title: "T-shirt".into(),
            quantity: 1,
            price: MinorUnits::from(sub_total),
            ..Default::default()
        }],
        total: MinorUnits::from(sub_total),
        sub_total: MinorUnits::from(sub_total),
        payment_method: Some(PaymentMethod { id: payment_method.into(), label: payment_method.into() }),
        ..Default::default()
    }
}

pub fn with_referrer(mut data: OrderData, referrer: &str) -> OrderData {
    data.referrer = Some(referrer.to_string());
    data
}
