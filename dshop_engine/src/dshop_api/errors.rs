use std::time::Duration;

use thiserror::Error;

use crate::{
    db_types::{EventName, OfferId},
    shop_config::ShopConfigError,
    traits::MarketplaceDbError,
};

/// Failures that stop an event from being reconciled. Nothing is written for the failing step, so the event can be
/// replayed once the cause is fixed.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Shop #{0} has no listing id, so its offer events cannot be reconciled")]
    ShopMissingListingId(i64),
    #[error("Order {0} does not exist, so the {1} event cannot be applied to it")]
    OrderNotFound(OfferId, EventName),
    #[error("The {0} event is missing required data. {1}")]
    MalformedEvent(EventName, String),
    #[error("No encrypted data found")]
    NoEncryptedData,
    #[error("Timed out after {1:?} fetching offer data {0}")]
    ContentFetchTimeout(String, Duration),
    #[error("Could not fetch offer data {0}. {1}")]
    ContentFetchFailed(String, String),
    #[error("The offer descriptor is not valid. {0}")]
    InvalidOfferDescriptor(String),
    #[error("Could not decrypt the offer data. {0}")]
    DecryptionFailed(String),
    #[error("Cannot refund order {0}. {1}")]
    MissingExternalPayment(OfferId, String),
    #[error("{0}")]
    ShopConfig(#[from] ShopConfigError),
    #[error("{0}")]
    Database(#[from] MarketplaceDbError),
}

#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("Network {0} is not configured")]
    UnknownNetwork(i64),
    #[error("No marketplace contract is configured for version {1} on network {0}")]
    UnknownContractVersion(i64, String),
    #[error("{0}")]
    Reconcile(#[from] ReconcileError),
    #[error("{0}")]
    Database(#[from] MarketplaceDbError),
}
