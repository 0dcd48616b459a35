use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{ExternalPayment, ListingId, Order, Shop},
    order_data::OrderData,
    shop_config::{ShopConfig, ShopConfigError},
};

#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("The request timed out. {0}")]
    Timeout(String),
    #[error("The service is unavailable. {0}")]
    Unavailable(String),
    #[error("The service rejected the request. {0}")]
    Rejected(String),
    #[error("The service returned a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// Fetches content-addressed documents from decentralized storage.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches the raw bytes stored under `ipfs_hash`, using the given gateway.
    async fn fetch(&self, gateway: &str, ipfs_hash: &str) -> Result<Vec<u8>, CollaboratorError>;
}

/// Recovers the plaintext order payload a buyer encrypted for the shop.
#[async_trait]
pub trait OfferDecryptor: Send + Sync {
    async fn decrypt(
        &self,
        config: &ShopConfig,
        gateway: &str,
        encrypted_hash: &str,
    ) -> Result<OrderData, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountValidation {
    Valid,
    Invalid(String),
}

/// Checks the discount attached to an order. A successful validation marks the discount as used.
#[async_trait]
pub trait DiscountValidator: Send + Sync {
    async fn validate(&self, shop: &Shop, data: &OrderData) -> Result<DiscountValidation, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundResult {
    Refunded,
    /// The gateway refused the refund. The reason is what gets shown to the merchant.
    Declined(String),
}

/// Reverses a payment taken by an external gateway.
///
/// The same order always produces the same `idempotency_key`. Implementations must not refund a payment twice for
/// one key, since a withdrawal whose write failed after the refund will be processed again.
#[async_trait]
pub trait RefundProcessor: Send + Sync {
    async fn refund(
        &self,
        config: &ShopConfig,
        payment: &ExternalPayment,
        idempotency_key: &str,
    ) -> Result<RefundResult, CollaboratorError>;
}

/// Kicks off automatic fulfillment of a new order.
#[async_trait]
pub trait FulfillmentService: Send + Sync {
    async fn fulfill(&self, shop: &Shop, order: &Order) -> Result<(), CollaboratorError>;
}

/// Tells the merchant (and the buyer) about new orders.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_new_order_email(&self, shop: &Shop, config: &ShopConfig, order: &Order)
        -> Result<(), CollaboratorError>;

    async fn post_new_order_summary(
        &self,
        shop: &Shop,
        config: &ShopConfig,
        order: &Order,
    ) -> Result<(), CollaboratorError>;
}

/// Reads shop configuration and writes the listing id into the shop's staged deployment configuration.
#[async_trait]
pub trait ShopConfigStore: Send + Sync {
    async fn load(&self, shop: &Shop) -> Result<ShopConfig, ShopConfigError>;

    /// Sets `networks.<network_id>.listingId` in the shop's staged configuration.
    async fn patch_listing_id(
        &self,
        shop: &Shop,
        network_id: i64,
        listing_id: &ListingId,
    ) -> Result<(), ShopConfigError>;
}

/// Every external system the reconciler talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentFetcher>,
    pub decryptor: Arc<dyn OfferDecryptor>,
    pub discounts: Arc<dyn DiscountValidator>,
    pub refunds: Arc<dyn RefundProcessor>,
    pub fulfillment: Arc<dyn FulfillmentService>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub shop_configs: Arc<dyn ShopConfigStore>,
}
