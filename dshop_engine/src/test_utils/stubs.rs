//! In-memory collaborators with knobs for failure injection and counters for assertions.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    db_types::{ExternalPayment, ListingId, Order, Shop},
    order_data::OrderData,
    shop_config::{ShopConfig, ShopConfigError},
    traits::{
        CollaboratorError,
        Collaborators,
        ContentFetcher,
        DiscountValidation,
        DiscountValidator,
        FulfillmentService,
        NotificationDispatcher,
        OfferDecryptor,
        RefundProcessor,
        RefundResult,
        ShopConfigStore,
    },
};

//--------------------------------------   Content fetcher   ---------------------------------------------------------
#[derive(Default)]
pub struct StubContentFetcher {
    documents: Mutex<HashMap<String, Vec<u8>>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StubContentFetcher {
    pub fn add_document(&self, ipfs_hash: &str, document: &Value) {
        let bytes = serde_json::to_vec(document).expect("Invalid document");
        self.documents.lock().unwrap().insert(ipfs_hash.to_string(), bytes);
    }

    /// Every fetch takes this long from now on.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for StubContentFetcher {
    async fn fetch(&self, _gateway: &str, ipfs_hash: &str) -> Result<Vec<u8>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let document = self.documents.lock().unwrap().get(ipfs_hash).cloned();
        document.ok_or_else(|| CollaboratorError::Unavailable(format!("{ipfs_hash} not found")))
    }
}

//--------------------------------------      Decryptor      ---------------------------------------------------------
#[derive(Default)]
pub struct StubDecryptor {
    payloads: Mutex<HashMap<String, OrderData>>,
}

impl StubDecryptor {
    pub fn add_payload(&self, encrypted_hash: &str, data: OrderData) {
        self.payloads.lock().unwrap().insert(encrypted_hash.to_string(), data);
    }
}

#[async_trait]
impl OfferDecryptor for StubDecryptor {
    async fn decrypt(
        &self,
        _config: &ShopConfig,
        _gateway: &str,
        encrypted_hash: &str,
    ) -> Result<OrderData, CollaboratorError> {
        let data = self.payloads.lock().unwrap().get(encrypted_hash).cloned();
        data.ok_or_else(|| CollaboratorError::Rejected(format!("Cannot decrypt {encrypted_hash}")))
    }
}

//--------------------------------------      Discounts      ---------------------------------------------------------
#[derive(Default)]
pub struct StubDiscounts {
    invalid_reason: Mutex<Option<String>>,
    used: AtomicUsize,
}

impl StubDiscounts {
    /// Every discount is rejected with this reason from now on.
    pub fn reject_with(&self, reason: &str) {
        *self.invalid_reason.lock().unwrap() = Some(reason.to_string());
    }

    /// The number of discounts marked as used
    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscountValidator for StubDiscounts {
    async fn validate(&self, _shop: &Shop, _data: &OrderData) -> Result<DiscountValidation, CollaboratorError> {
        let reason = self.invalid_reason.lock().unwrap().clone();
        match reason {
            Some(reason) => Ok(DiscountValidation::Invalid(reason)),
            None => {
                self.used.fetch_add(1, Ordering::SeqCst);
                Ok(DiscountValidation::Valid)
            },
        }
    }
}

//--------------------------------------       Refunds       ---------------------------------------------------------
#[derive(Default)]
pub struct StubRefunds {
    declined: Mutex<Option<String>>,
    refunded: Mutex<Vec<String>>,
    keys: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubRefunds {
    pub fn decline_with(&self, reason: &str) {
        *self.declined.lock().unwrap() = Some(reason.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Payment references that were refunded successfully
    pub fn refunded(&self) -> Vec<String> {
        self.refunded.lock().unwrap().clone()
    }

    /// The idempotency key of every call, in order
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefundProcessor for StubRefunds {
    async fn refund(
        &self,
        _config: &ShopConfig,
        payment: &ExternalPayment,
        idempotency_key: &str,
    ) -> Result<RefundResult, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let repeated = {
            let mut keys = self.keys.lock().unwrap();
            let repeated = keys.iter().any(|k| k == idempotency_key);
            keys.push(idempotency_key.to_string());
            repeated
        };
        let declined = self.declined.lock().unwrap().clone();
        match declined {
            Some(reason) => Ok(RefundResult::Declined(reason)),
            // Like a real gateway, a repeated key returns the original result without moving money again
            None if repeated => Ok(RefundResult::Refunded),
            None => {
                self.refunded.lock().unwrap().push(payment.payment_reference.clone().unwrap_or_default());
                Ok(RefundResult::Refunded)
            },
        }
    }
}

//--------------------------------------     Fulfillment     ---------------------------------------------------------
#[derive(Default)]
pub struct StubFulfillment {
    fail: Mutex<bool>,
    calls: AtomicUsize,
}

impl StubFulfillment {
    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FulfillmentService for StubFulfillment {
    async fn fulfill(&self, _shop: &Shop, order: &Order) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(CollaboratorError::Unavailable(format!("Cannot fulfill {}", order.order_id)));
        }
        Ok(())
    }
}

//--------------------------------------     Notifications   ---------------------------------------------------------
#[derive(Default)]
pub struct StubNotifier {
    fail_email: Mutex<bool>,
    fail_webhook: Mutex<bool>,
    emails: AtomicUsize,
    webhooks: AtomicUsize,
}

impl StubNotifier {
    pub fn fail_email(&self) {
        *self.fail_email.lock().unwrap() = true;
    }

    pub fn fail_webhook(&self) {
        *self.fail_webhook.lock().unwrap() = true;
    }

    pub fn emails(&self) -> usize {
        self.emails.load(Ordering::SeqCst)
    }

    pub fn webhooks(&self) -> usize {
        self.webhooks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationDispatcher for StubNotifier {
    async fn send_new_order_email(
        &self,
        _shop: &Shop,
        _config: &ShopConfig,
        _order: &Order,
    ) -> Result<(), CollaboratorError> {
        if *self.fail_email.lock().unwrap() {
            return Err(CollaboratorError::Unavailable("SMTP is down".into()));
        }
        self.emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn post_new_order_summary(
        &self,
        _shop: &Shop,
        _config: &ShopConfig,
        _order: &Order,
    ) -> Result<(), CollaboratorError> {
        if *self.fail_webhook.lock().unwrap() {
            return Err(CollaboratorError::Rejected("Webhook returned 404".into()));
        }
        self.webhooks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//--------------------------------------    Shop configs     ---------------------------------------------------------
/// Loads configuration from the shop row and records listing-id patches in memory.
#[derive(Default)]
pub struct MemoryShopConfigStore {
    fail_patch: Mutex<bool>,
    patches: Mutex<Vec<(i64, i64, ListingId)>>,
}

impl MemoryShopConfigStore {
    pub fn fail_patches(&self) {
        *self.fail_patch.lock().unwrap() = true;
    }

    /// `(shop id, network id, listing id)` for every successful patch
    pub fn patches(&self) -> Vec<(i64, i64, ListingId)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShopConfigStore for MemoryShopConfigStore {
    async fn load(&self, shop: &Shop) -> Result<ShopConfig, ShopConfigError> {
        ShopConfig::parse(&shop.config)
    }

    async fn patch_listing_id(
        &self,
        shop: &Shop,
        network_id: i64,
        listing_id: &ListingId,
    ) -> Result<(), ShopConfigError> {
        if *self.fail_patch.lock().unwrap() {
            return Err(ShopConfigError::Io("Permission denied".into()));
        }
        self.patches.lock().unwrap().push((shop.id, network_id, listing_id.clone()));
        Ok(())
    }
}

/// All the stubs, kept around so tests can configure them and inspect what happened.
#[derive(Clone, Default)]
pub struct TestCollaborators {
    pub content: Arc<StubContentFetcher>,
    pub decryptor: Arc<StubDecryptor>,
    pub discounts: Arc<StubDiscounts>,
    pub refunds: Arc<StubRefunds>,
    pub fulfillment: Arc<StubFulfillment>,
    pub notifier: Arc<StubNotifier>,
    pub shop_configs: Arc<MemoryShopConfigStore>,
}

impl TestCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            content: self.content.clone(),
            decryptor: self.decryptor.clone(),
            discounts: self.discounts.clone(),
            refunds: self.refunds.clone(),
            fulfillment: self.fulfillment.clone(),
            notifier: self.notifier.clone(),
            shop_configs: self.shop_configs.clone(),
        }
    }

    /// Swaps in a different refund processor, e.g. a mock.
    pub fn collaborators_with_refunds(&self, refunds: Arc<dyn RefundProcessor>) -> Collaborators {
        Collaborators { refunds, ..self.collaborators() }
    }

    /// Makes an offer fetchable and decryptable: the descriptor under `ipfs_hash` points at `encrypted_hash`, which
    /// decrypts to `data`.
    pub fn publish_offer(&self, ipfs_hash: &str, encrypted_hash: &str, payment_code: Option<&str>, data: OrderData) {
        let mut descriptor = serde_json::json!({ "encryptedData": encrypted_hash });
        if let Some(code) = payment_code {
            descriptor["paymentCode"] = Value::String(code.to_string());
        }
        self.content.add_document(ipfs_hash, &descriptor);
        self.decryptor.add_payload(encrypted_hash, data);
    }
}
