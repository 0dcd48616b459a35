use chrono::Utc;
use log::*;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use super::column_decode_error;
use crate::{
    db_types::{NewOrder, OfferId, Order, OrderStatus, OrderUpdate},
    order_data::OrderData,
    traits::MarketplaceDbError,
};

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status = row
            .try_get::<String, _>("status")?
            .parse::<OrderStatus>()
            .map_err(|e| column_decode_error("status", e))?;
        let data = serde_json::from_str::<OrderData>(&row.try_get::<String, _>("data")?)
            .map_err(|e| column_decode_error("data", e))?;
        Ok(Self {
            id: row.try_get("id")?,
            network_id: row.try_get("network_id")?,
            shop_id: row.try_get("shop_id")?,
            order_id: row.try_get("order_id")?,
            status,
            data,
            ipfs_hash: row.try_get("ipfs_hash")?,
            encrypted_ipfs_hash: row.try_get("encrypted_ipfs_hash")?,
            payment_code: row.try_get("payment_code")?,
            referrer: row.try_get("referrer")?,
            commission_pending: row.try_get("commission_pending")?,
            created_block: row.try_get("created_block")?,
            updated_block: row.try_get("updated_block")?,
            updated_log_index: row.try_get("updated_log_index")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
///
/// Like the event insert, the write goes first and the read only happens on a conflict.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), MarketplaceDbError> {
    let network_id = order.network_id;
    let shop_id = order.shop_id;
    let order_id = order.order_id.clone();
    if let Some(order) = insert_order(order, conn).await? {
        debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
        return Ok((order, true));
    }
    let existing = fetch_order(network_id, shop_id, &order_id, conn)
        .await?
        .ok_or_else(|| MarketplaceDbError::DatabaseError(format!("Order {order_id} conflicted but is not stored")))?;
    trace!("🗃️ Order [{order_id}] already exists as #{}", existing.id);
    Ok((existing, false))
}

/// Inserts a new order, or does nothing if the shop already has an order with this id. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceDbError> {
    let data = serde_json::to_string(&order.data)?;
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                network_id,
                shop_id,
                order_id,
                status,
                data,
                ipfs_hash,
                encrypted_ipfs_hash,
                payment_code,
                referrer,
                commission_pending,
                created_block,
                updated_block,
                updated_log_index,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12, $13, $13)
            ON CONFLICT (network_id, shop_id, order_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.network_id)
    .bind(order.shop_id)
    .bind(order.order_id.as_str())
    .bind(order.status.to_string())
    .bind(data)
    .bind(order.ipfs_hash)
    .bind(order.encrypted_ipfs_hash)
    .bind(order.payment_code)
    .bind(order.referrer)
    .bind(order.commission_pending)
    .bind(order.block_number)
    .bind(order.log_index)
    .bind(order.created_at)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(
    network_id: i64,
    shop_id: i64,
    order_id: &OfferId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE network_id = $1 AND shop_id = $2 AND order_id = $3")
        .bind(network_id)
        .bind(shop_id)
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// All orders for the shop, ordered by `created_at` and then id.
pub async fn fetch_orders_for_shop(shop_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE shop_id = $1 ORDER BY created_at, id").bind(shop_id).fetch_all(conn).await
}

/// Applies the non-empty fields of `update` to the order. Returns `None` if the order does not exist.
pub async fn update_order(
    id: i64,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceDbError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for order #{id}. Update request skipped.");
        return Ok(fetch_order_by_id(id, conn).await?);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(data) = update.data {
        builder.push(", data = ");
        builder.push_bind(serde_json::to_string(&data)?);
    }
    if let Some((block, log_index)) = update.position {
        builder.push(", updated_block = ");
        builder.push_bind(block);
        builder.push(", updated_log_index = ");
        builder.push_bind(log_index);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(res)
}
