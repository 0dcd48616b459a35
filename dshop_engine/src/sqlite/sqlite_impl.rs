//! `SqliteDatabase` is a concrete implementation of a dshop engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, events, external_payments, new_pool, orders, shops};
use crate::{
    db_types::{
        ExternalPayment,
        ListingId,
        NewEvent,
        NewExternalPayment,
        NewOrder,
        NewShop,
        OfferId,
        Order,
        OrderUpdate,
        RecordedEvent,
        Shop,
        StoredEvent,
    },
    traits::{
        EventStore,
        ExternalPaymentManagement,
        MarketplaceDatabase,
        MarketplaceDbError,
        OrderManagement,
        ShopManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), MarketplaceDbError> {
        self.pool.close().await;
        Ok(())
    }
}

impl EventStore for SqliteDatabase {
    async fn record_event(&self, event: NewEvent) -> Result<RecordedEvent, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let recorded = events::idempotent_insert(event, &mut tx).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    async fn fetch_event(
        &self,
        network_id: i64,
        transaction_hash: &str,
        log_index: i64,
    ) -> Result<Option<StoredEvent>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::fetch_event(network_id, transaction_hash, log_index, &mut conn).await?;
        Ok(event)
    }

    async fn fetch_events_for_transaction(
        &self,
        network_id: i64,
        transaction_hash: &str,
    ) -> Result<Vec<StoredEvent>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let events = events::fetch_events_for_transaction(network_id, transaction_hash, &mut conn).await?;
        Ok(events)
    }
}

impl ShopManagement for SqliteDatabase {
    async fn fetch_shop(&self, shop_id: i64) -> Result<Option<Shop>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let shop = shops::fetch_shop(shop_id, &mut conn).await?;
        Ok(shop)
    }

    async fn fetch_shop_by_listing_id(&self, listing_id: &ListingId) -> Result<Option<Shop>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let shop = shops::fetch_shop_by_listing_id(listing_id, &mut conn).await?;
        Ok(shop)
    }

    async fn fetch_pending_shop_for_wallet(&self, wallet: &str) -> Result<Option<Shop>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let shop = shops::fetch_pending_shop_for_wallet(wallet, &mut conn).await?;
        Ok(shop)
    }

    async fn assign_listing_id(&self, shop_id: i64, listing_id: &ListingId) -> Result<Shop, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let shop = shops::assign_listing_id(shop_id, listing_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Shop #{shop_id} is now linked to listing {listing_id}");
        Ok(shop)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(
        &self,
        network_id: i64,
        shop_id: i64,
        order_id: &OfferId,
    ) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(network_id, shop_id, order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order(id, update, &mut tx).await?.ok_or(MarketplaceDbError::OrderIdNotFound(id))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_orders_for_shop(&self, shop_id: i64) -> Result<Vec<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_shop(shop_id, &mut conn).await?;
        Ok(orders)
    }
}

impl ExternalPaymentManagement for SqliteDatabase {
    async fn fetch_external_payment(&self, payment_code: &str) -> Result<Option<ExternalPayment>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let payment = external_payments::fetch_external_payment(payment_code, &mut conn).await?;
        Ok(payment)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), MarketplaceDbError> {
        migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MarketplaceDbError::DatabaseError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Shops are created by the shop admin tooling. This is here for that tooling and for tests.
    pub async fn insert_shop(&self, shop: NewShop) -> Result<Shop, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let shop = shops::insert_shop(shop, &mut tx).await?;
        tx.commit().await?;
        Ok(shop)
    }

    /// External payments are recorded by the checkout flow. This is here for that flow and for tests.
    pub async fn insert_external_payment(
        &self,
        payment: NewExternalPayment,
    ) -> Result<ExternalPayment, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let payment = external_payments::insert_external_payment(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }
}
