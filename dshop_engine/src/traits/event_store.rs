use crate::{
    db_types::{NewEvent, RecordedEvent, StoredEvent},
    traits::MarketplaceDbError,
};

/// The append-only log of marketplace events.
#[allow(async_fn_in_trait)]
pub trait EventStore {
    /// Stores the event, unless an event with the same `(network_id, transaction_hash, log_index)` already exists.
    ///
    /// Re-recording an event never creates a new row. If the stored copy has no shop id and the new one does, the
    /// shop id is filled in. Either way the canonical stored record is returned, with `inserted` set if the row is
    /// new.
    async fn record_event(&self, event: NewEvent) -> Result<RecordedEvent, MarketplaceDbError>;

    /// Fetches a single event by its natural key.
    async fn fetch_event(
        &self,
        network_id: i64,
        transaction_hash: &str,
        log_index: i64,
    ) -> Result<Option<StoredEvent>, MarketplaceDbError>;

    /// All the events that were emitted in the given transaction, in log order.
    async fn fetch_events_for_transaction(
        &self,
        network_id: i64,
        transaction_hash: &str,
    ) -> Result<Vec<StoredEvent>, MarketplaceDbError>;
}
