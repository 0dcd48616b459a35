use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dshop_common::MinorUnits;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::order_data::OrderData;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      EventName      ---------------------------------------------------------
/// Every event the marketplace contract can emit.
///
/// The set is closed: adding a new kind is a compile-time-checked change for every `match` on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    MarketplaceData,
    AffiliateAdded,
    AffiliateRemoved,
    ListingCreated,
    ListingUpdated,
    ListingWithdrawn,
    ListingArbitrated,
    ListingData,
    OfferCreated,
    OfferAccepted,
    OfferFinalized,
    OfferWithdrawn,
    OfferFundsAdded,
    OfferDisputed,
    OfferRuled,
    OfferData,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::MarketplaceData => "MarketplaceData",
            EventName::AffiliateAdded => "AffiliateAdded",
            EventName::AffiliateRemoved => "AffiliateRemoved",
            EventName::ListingCreated => "ListingCreated",
            EventName::ListingUpdated => "ListingUpdated",
            EventName::ListingWithdrawn => "ListingWithdrawn",
            EventName::ListingArbitrated => "ListingArbitrated",
            EventName::ListingData => "ListingData",
            EventName::OfferCreated => "OfferCreated",
            EventName::OfferAccepted => "OfferAccepted",
            EventName::OfferFinalized => "OfferFinalized",
            EventName::OfferWithdrawn => "OfferWithdrawn",
            EventName::OfferFundsAdded => "OfferFundsAdded",
            EventName::OfferDisputed => "OfferDisputed",
            EventName::OfferRuled => "OfferRuled",
            EventName::OfferData => "OfferData",
        }
    }

    /// True for every event that refers to a specific offer on a listing.
    pub fn is_offer_event(&self) -> bool {
        matches!(
            self,
            EventName::OfferCreated |
                EventName::OfferAccepted |
                EventName::OfferFinalized |
                EventName::OfferWithdrawn |
                EventName::OfferFundsAdded |
                EventName::OfferDisputed |
                EventName::OfferRuled |
                EventName::OfferData
        )
    }
}

impl Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MarketplaceData" => Ok(Self::MarketplaceData),
            "AffiliateAdded" => Ok(Self::AffiliateAdded),
            "AffiliateRemoved" => Ok(Self::AffiliateRemoved),
            "ListingCreated" => Ok(Self::ListingCreated),
            "ListingUpdated" => Ok(Self::ListingUpdated),
            "ListingWithdrawn" => Ok(Self::ListingWithdrawn),
            "ListingArbitrated" => Ok(Self::ListingArbitrated),
            "ListingData" => Ok(Self::ListingData),
            "OfferCreated" => Ok(Self::OfferCreated),
            "OfferAccepted" => Ok(Self::OfferAccepted),
            "OfferFinalized" => Ok(Self::OfferFinalized),
            "OfferWithdrawn" => Ok(Self::OfferWithdrawn),
            "OfferFundsAdded" => Ok(Self::OfferFundsAdded),
            "OfferDisputed" => Ok(Self::OfferDisputed),
            "OfferRuled" => Ok(Self::OfferRuled),
            "OfferData" => Ok(Self::OfferData),
            s => Err(ConversionError(format!("Unknown event name: {s}"))),
        }
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
/// The lifecycle status of an order. It mirrors the name of the last offer event applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The buyer has made an offer, and the order has been created off-chain.
    OfferCreated,
    /// The seller accepted the offer.
    OfferAccepted,
    /// The buyer finalized the offer, releasing funds to the seller.
    OfferFinalized,
    /// The offer was withdrawn by either party before finalization.
    OfferWithdrawn,
}

impl OrderStatus {
    /// Maps an event to the status it produces, if it is part of the order lifecycle.
    pub fn from_event(name: EventName) -> Option<Self> {
        match name {
            EventName::OfferCreated => Some(Self::OfferCreated),
            EventName::OfferAccepted => Some(Self::OfferAccepted),
            EventName::OfferFinalized => Some(Self::OfferFinalized),
            EventName::OfferWithdrawn => Some(Self::OfferWithdrawn),
            _ => None,
        }
    }

    /// The forward-only transition table:
    ///
    /// | From \ To      | Created | Accepted | Finalized | Withdrawn |
    /// |----------------|---------|----------|-----------|-----------|
    /// | OfferCreated   | no      | yes      | yes       | yes       |
    /// | OfferAccepted  | no      | no       | yes       | yes       |
    /// | OfferFinalized | no      | no       | no        | no        |
    /// | OfferWithdrawn | no      | no       | no        | no        |
    ///
    /// An order may go straight from created to finalized.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (OfferCreated, OfferAccepted | OfferFinalized | OfferWithdrawn) |
                (OfferAccepted, OfferFinalized | OfferWithdrawn)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::OfferFinalized | OrderStatus::OfferWithdrawn)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::OfferCreated => write!(f, "OfferCreated"),
            OrderStatus::OfferAccepted => write!(f, "OfferAccepted"),
            OrderStatus::OfferFinalized => write!(f, "OfferFinalized"),
            OrderStatus::OfferWithdrawn => write!(f, "OfferWithdrawn"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OfferCreated" => Ok(Self::OfferCreated),
            "OfferAccepted" => Ok(Self::OfferAccepted),
            "OfferFinalized" => Ok(Self::OfferFinalized),
            "OfferWithdrawn" => Ok(Self::OfferWithdrawn),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      ListingId      ---------------------------------------------------------
/// A fully-qualified listing id: `<network>-<contract version>-<on-chain listing number>`, e.g. `1-001-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(network_id: i64, contract_version: &str, listing_number: i64) -> Self {
        Self(format!("{network_id}-{contract_version}-{listing_number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ListingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------       OfferId       ---------------------------------------------------------
/// A fully-qualified offer id: the fully-qualified listing id, a dash, and the offer sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OfferId(String);

impl OfferId {
    pub fn new(listing_id: &ListingId, offer_number: i64) -> Self {
        Self(format!("{listing_id}-{offer_number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OfferId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OfferId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for OfferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------     StoredEvent     ---------------------------------------------------------
/// One marketplace log entry, exactly as it was observed. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    pub network_id: i64,
    pub contract_version: String,
    /// The shop the event belongs to, if it could be associated with one when it was recorded.
    pub shop_id: Option<i64>,
    pub event_name: EventName,
    /// The on-chain listing number (not fully qualified)
    pub listing_id: Option<i64>,
    /// The on-chain offer sequence number within the listing
    pub offer_id: Option<i64>,
    /// The checksummed address of the account that triggered the event
    pub party: String,
    pub ipfs_hash: Option<String>,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub transaction_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub block_hash: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// The position of the event in the chain. Positions are totally ordered.
    pub fn position(&self) -> (i64, i64) {
        (self.block_number, self.log_index)
    }
}

//--------------------------------------       NewEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub network_id: i64,
    pub contract_version: String,
    pub shop_id: Option<i64>,
    pub event_name: EventName,
    pub listing_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub party: String,
    pub ipfs_hash: Option<String>,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub transaction_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub block_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl NewEvent {
    pub fn with_shop_id(mut self, shop_id: Option<i64>) -> Self {
        self.shop_id = shop_id;
        self
    }
}

/// The result of recording an event. `inserted` is false when the event had already been stored.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: StoredEvent,
    pub inserted: bool,
}

//--------------------------------------         Shop        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    /// The wallet that creates the shop's listing on-chain
    pub wallet_address: String,
    /// Null until the first `ListingCreated` event from the wallet is resolved
    pub listing_id: Option<ListingId>,
    /// The shop configuration blob, as stored
    pub config: String,
    /// Where the shop's deployable files (including the staged `config.json`) live
    pub data_dir: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub wallet_address: String,
    pub config: String,
    pub data_dir: String,
    pub created_at: DateTime<Utc>,
}

impl NewShop {
    pub fn new<S: Into<String>>(name: S, wallet_address: S, data_dir: S) -> Self {
        Self {
            name: name.into(),
            wallet_address: wallet_address.into(),
            config: "{}".to_string(),
            data_dir: data_dir.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_config<S: Into<String>>(mut self, config: S) -> Self {
        self.config = config.into();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: i64,
    pub network_id: i64,
    pub shop_id: i64,
    /// The fully-qualified offer id
    pub order_id: OfferId,
    pub status: OrderStatus,
    /// The decrypted order payload
    pub data: OrderData,
    pub ipfs_hash: Option<String>,
    pub encrypted_ipfs_hash: Option<String>,
    /// Correlates the order with a payment taken by an external gateway
    pub payment_code: Option<String>,
    pub referrer: Option<String>,
    pub commission_pending: Option<MinorUnits>,
    pub created_block: i64,
    pub updated_block: i64,
    pub updated_log_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The chain position of the last event applied to this order.
    pub fn position(&self) -> (i64, i64) {
        (self.updated_block, self.updated_log_index)
    }
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub network_id: i64,
    pub shop_id: i64,
    pub order_id: OfferId,
    pub status: OrderStatus,
    pub data: OrderData,
    pub ipfs_hash: Option<String>,
    pub encrypted_ipfs_hash: Option<String>,
    pub payment_code: Option<String>,
    pub referrer: Option<String>,
    pub commission_pending: Option<MinorUnits>,
    pub block_number: i64,
    pub log_index: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     OrderUpdate     ---------------------------------------------------------
/// The mutable subset of an order. Only the fields that are set are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub data: Option<OrderData>,
    pub position: Option<(i64, i64)>,
}

impl OrderUpdate {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_data(mut self, data: OrderData) -> Self {
        self.data = Some(data);
        self
    }

    /// Records the block number and log index of the event that produced this update.
    pub fn at_position(mut self, block_number: i64, log_index: i64) -> Self {
        self.position = Some((block_number, log_index));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.data.is_none() && self.position.is_none()
    }
}

//--------------------------------------   ExternalPayment   ---------------------------------------------------------
/// A payment taken off-chain by a gateway (e.g. a card payment). Written by the checkout flow, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ExternalPayment {
    pub id: i64,
    pub payment_code: String,
    /// The gateway's reference for the payment, e.g. a Stripe payment intent id
    pub payment_reference: Option<String>,
    pub provider: String,
    pub amount: Option<MinorUnits>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExternalPayment {
    pub payment_code: String,
    pub payment_reference: Option<String>,
    pub provider: String,
    pub amount: Option<MinorUnits>,
    pub currency: Option<String>,
}

impl NewExternalPayment {
    pub fn new<S: Into<String>>(payment_code: S, provider: S) -> Self {
        Self {
            payment_code: payment_code.into(),
            payment_reference: None,
            provider: provider.into(),
            amount: None,
            currency: None,
        }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn with_amount(mut self, amount: MinorUnits, currency: &str) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.to_string());
        self
    }
}
