use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ListingId, NewShop, Shop},
    traits::MarketplaceDbError,
};

pub async fn insert_shop(shop: NewShop, conn: &mut SqliteConnection) -> Result<Shop, sqlx::Error> {
    let shop: Shop = sqlx::query_as(
        r#"
            INSERT INTO shops (name, wallet_address, config, data_dir, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(shop.name)
    .bind(shop.wallet_address)
    .bind(shop.config)
    .bind(shop.data_dir)
    .bind(shop.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Shop '{}' created with id {}", shop.name, shop.id);
    Ok(shop)
}

pub async fn fetch_shop(id: i64, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_shop_by_listing_id(
    listing_id: &ListingId,
    conn: &mut SqliteConnection,
) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE listing_id = $1").bind(listing_id.as_str()).fetch_optional(conn).await
}

/// The most recently updated shop that belongs to `wallet` and has no listing yet. Ties go to the highest id.
pub async fn fetch_pending_shop_for_wallet(
    wallet: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM shops
            WHERE wallet_address = $1 COLLATE NOCASE AND listing_id IS NULL
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
        "#,
    )
    .bind(wallet.trim())
    .fetch_optional(conn)
    .await
}

pub async fn assign_listing_id(
    id: i64,
    listing_id: &ListingId,
    conn: &mut SqliteConnection,
) -> Result<Shop, MarketplaceDbError> {
    let shop = sqlx::query_as("UPDATE shops SET listing_id = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(listing_id.as_str())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(MarketplaceDbError::ShopNotFound(id))?;
    Ok(shop)
}
