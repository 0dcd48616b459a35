#![allow(dead_code)]
use std::sync::Arc;

use dshop_engine::{
    contract::RawLog,
    db_types::{ListingId, NewExternalPayment, Shop},
    events::EventProducers,
    outcomes::IngestOutcome,
    test_utils::{
        fixtures::{listing_created_log, pending_shop, registry, CONTRACT_VERSION, NETWORK_ID, SELLER},
        prepare_env::{prepare_test_env, random_db_path},
        stubs::TestCollaborators,
    },
    traits::RefundProcessor,
    Collaborators,
    EngineConfig,
    EventIngestor,
    IngestError,
    MarketplaceDatabase,
    OrderReconciler,
    ShopManagement,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const LISTING: u64 = 7;

pub struct TestSystem {
    pub stubs: TestCollaborators,
    pub ingestor: EventIngestor<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new(config: EngineConfig) -> Self {
        let stubs = TestCollaborators::new();
        let collaborators = stubs.collaborators();
        Self::with_collaborators(config, stubs, collaborators, EventProducers::default()).await
    }

    /// Like `new`, with hook subscribers attached.
    pub async fn with_producers(config: EngineConfig, producers: EventProducers) -> Self {
        let stubs = TestCollaborators::new();
        let collaborators = stubs.collaborators();
        Self::with_collaborators(config, stubs, collaborators, producers).await
    }

    /// Like `new`, but refunds go to the given processor rather than the stub.
    pub async fn with_refunds(config: EngineConfig, refunds: Arc<dyn RefundProcessor>) -> Self {
        let stubs = TestCollaborators::new();
        let collaborators = stubs.collaborators_with_refunds(refunds);
        Self::with_collaborators(config, stubs, collaborators, EventProducers::default()).await
    }

    async fn with_collaborators(
        config: EngineConfig,
        stubs: TestCollaborators,
        collaborators: Collaborators,
        producers: EventProducers,
    ) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let reconciler = OrderReconciler::new(db, collaborators, config).with_producers(producers);
        let ingestor = EventIngestor::new(reconciler, registry());
        Self { stubs, ingestor }
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.ingestor.reconciler().db()
    }

    pub async fn ingest(&self, log: RawLog) -> Result<IngestOutcome, IngestError> {
        self.ingestor.ingest(NETWORK_ID, CONTRACT_VERSION, log).await
    }

    /// Creates a pending shop for `SELLER` and resolves it to listing `LISTING`.
    pub async fn shop_with_listing(&self, name: &str) -> Shop {
        let shop = self.db().insert_shop(pending_shop(name)).await.expect("Error inserting shop");
        self.ingest(listing_created_log(SELLER, LISTING, 100, 0)).await.expect("Error resolving listing");
        let shop = self.db().fetch_shop(shop.id).await.unwrap().expect("Shop went missing");
        assert_eq!(shop.listing_id, Some(listing_id()));
        shop
    }

    pub async fn stripe_payment(&self, code: &str, reference: &str) {
        let payment = NewExternalPayment::new(code, "stripe").with_reference(reference);
        self.db().insert_external_payment(payment).await.expect("Error inserting external payment");
    }

    pub async fn tear_down(self) {
        let mut db = self.ingestor.reconciler().db().clone();
        let url = db.url().to_string();
        if let Err(e) = db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove test database {url}: {e}");
        }
    }
}

pub fn listing_id() -> ListingId {
    ListingId::new(NETWORK_ID, CONTRACT_VERSION, LISTING as i64)
}
