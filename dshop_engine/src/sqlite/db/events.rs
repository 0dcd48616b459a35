use chrono::Utc;
use log::*;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::column_decode_error;
use crate::{
    db_types::{EventName, NewEvent, RecordedEvent, StoredEvent},
    traits::MarketplaceDbError,
};

impl<'r> FromRow<'r, SqliteRow> for StoredEvent {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let event_name = row
            .try_get::<String, _>("event_name")?
            .parse::<EventName>()
            .map_err(|e| column_decode_error("event_name", e))?;
        let topics = serde_json::from_str::<Vec<String>>(&row.try_get::<String, _>("topics")?)
            .map_err(|e| column_decode_error("topics", e))?;
        Ok(Self {
            id: row.try_get("id")?,
            network_id: row.try_get("network_id")?,
            contract_version: row.try_get("contract_version")?,
            shop_id: row.try_get("shop_id")?,
            event_name,
            listing_id: row.try_get("listing_id")?,
            offer_id: row.try_get("offer_id")?,
            party: row.try_get("party")?,
            ipfs_hash: row.try_get("ipfs_hash")?,
            address: row.try_get("address")?,
            topics,
            data: row.try_get("data")?,
            transaction_hash: row.try_get("transaction_hash")?,
            log_index: row.try_get("log_index")?,
            block_number: row.try_get("block_number")?,
            block_hash: row.try_get("block_hash")?,
            timestamp: row.try_get("timestamp")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Stores the event unless it is already present, returning `inserted = false` in that case.
///
/// If the stored copy is not associated with a shop yet but the new one is, the shop id is filled in place.
/// The insert is the first statement, so a wrapping transaction starts out holding the write lock.
pub async fn idempotent_insert(
    event: NewEvent,
    conn: &mut SqliteConnection,
) -> Result<RecordedEvent, MarketplaceDbError> {
    let network_id = event.network_id;
    let transaction_hash = event.transaction_hash.clone();
    let log_index = event.log_index;
    let shop_id = event.shop_id;
    if let Some(stored) = insert_event(event, conn).await? {
        debug!("🗃️ {} event recorded with id {}", stored.event_name, stored.id);
        return Ok(RecordedEvent { event: stored, inserted: true });
    }
    let stored = fetch_event(network_id, &transaction_hash, log_index, conn).await?.ok_or_else(|| {
        MarketplaceDbError::DatabaseError(format!("Event {transaction_hash}:{log_index} conflicted but is not stored"))
    })?;
    let stored = match (stored.shop_id, shop_id) {
        (None, Some(shop_id)) => {
            debug!("🗃️ Associating previously seen event #{} with shop {shop_id}", stored.id);
            set_shop_id(stored.id, shop_id, conn).await?
        },
        _ => stored,
    };
    trace!("🗃️ Event {}:{} has already been recorded as #{}", stored.transaction_hash, stored.log_index, stored.id);
    Ok(RecordedEvent { event: stored, inserted: false })
}

/// Inserts the event, or does nothing if an event with the same natural key exists.
async fn insert_event(
    event: NewEvent,
    conn: &mut SqliteConnection,
) -> Result<Option<StoredEvent>, MarketplaceDbError> {
    let topics = serde_json::to_string(&event.topics)?;
    let stored = sqlx::query_as(
        r#"
            INSERT INTO events (
                network_id,
                contract_version,
                shop_id,
                event_name,
                listing_id,
                offer_id,
                party,
                ipfs_hash,
                address,
                topics,
                data,
                transaction_hash,
                log_index,
                block_number,
                block_hash,
                timestamp,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (network_id, transaction_hash, log_index) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(event.network_id)
    .bind(event.contract_version)
    .bind(event.shop_id)
    .bind(event.event_name.to_string())
    .bind(event.listing_id)
    .bind(event.offer_id)
    .bind(event.party)
    .bind(event.ipfs_hash)
    .bind(event.address)
    .bind(topics)
    .bind(event.data)
    .bind(event.transaction_hash)
    .bind(event.log_index)
    .bind(event.block_number)
    .bind(event.block_hash)
    .bind(event.timestamp)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    Ok(stored)
}

async fn set_shop_id(id: i64, shop_id: i64, conn: &mut SqliteConnection) -> Result<StoredEvent, sqlx::Error> {
    sqlx::query_as("UPDATE events SET shop_id = $1 WHERE id = $2 RETURNING *")
        .bind(shop_id)
        .bind(id)
        .fetch_one(conn)
        .await
}

pub async fn fetch_event(
    network_id: i64,
    transaction_hash: &str,
    log_index: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StoredEvent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE network_id = $1 AND transaction_hash = $2 AND log_index = $3")
        .bind(network_id)
        .bind(transaction_hash)
        .bind(log_index)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_events_for_transaction(
    network_id: i64,
    transaction_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<StoredEvent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE network_id = $1 AND transaction_hash = $2 ORDER BY log_index")
        .bind(network_id)
        .bind(transaction_hash)
        .fetch_all(conn)
        .await
}
