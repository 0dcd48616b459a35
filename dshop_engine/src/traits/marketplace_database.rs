use thiserror::Error;

use crate::traits::{EventStore, ExternalPaymentManagement, OrderManagement, ShopManagement};

/// The highest level of behaviour for backends supporting the dshop engine.
///
/// A backend stores marketplace events, shops, orders and external payment records. Each concern has its own trait;
/// this one ties them together and adds housekeeping.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + EventStore + ShopManagement + OrderManagement + ExternalPaymentManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceDbError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceDbError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested shop (id {0}) does not exist")]
    ShopNotFound(i64),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("Stored data could not be serialized or deserialized. {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for MarketplaceDbError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceDbError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for MarketplaceDbError {
    fn from(e: serde_json::Error) -> Self {
        MarketplaceDbError::InvalidData(e.to_string())
    }
}
