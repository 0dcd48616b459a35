//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod events;
pub mod external_payments;
pub mod orders;
pub mod shops;

const SQLITE_DB_URL: &str = "sqlite://data/dshop.db";

pub fn db_url() -> String {
    let result = env::var("DSHOP_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ DSHOP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Wraps a decoding failure in a column so that it surfaces as a regular sqlx error.
pub(crate) fn column_decode_error<E>(column: &str, e: E) -> SqlxError
where E: std::error::Error + Send + Sync + 'static {
    SqlxError::ColumnDecode { index: column.to_string(), source: Box::new(e) }
}
