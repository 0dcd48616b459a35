//! dshop Engine
//!
//! The dshop engine turns marketplace smart-contract events into shop orders. Every observed log line is decoded,
//! stored verbatim for audit and replay, and then reconciled against the order store, driving refunds, fulfillment
//! and notifications along the way.
//!
//! The library is divided into these main sections:
//! 1. Contract event decoding ([`mod@contract`]). Raw logs are matched against the marketplace interface and turned
//!    into typed events. Logs that match nothing are skipped, never treated as errors.
//! 2. Database management and control ([`mod@traits`] and, for the SQLite backend, [`SqliteDatabase`]). Backends
//!    implement the [`MarketplaceDatabase`] family of traits. The data types used in the database live in
//!    [`mod@db_types`] and are public.
//! 3. The engine public API ([`OrderReconciler`] and [`EventIngestor`]). The reconciler is the order state machine; the
//!    ingestor is the entrypoint for raw logs and serializes work per offer.
//!
//! External systems (content storage, decryption, discounts, payment gateways, notifications) are reached through the
//! collaborator traits in [`mod@traits`], bundled in [`Collaborators`].
//!
//! The engine also publishes events that downstream components can subscribe to using the hook system in
//! [`mod@events`], e.g. an `OrderCreatedEvent` is emitted whenever a new order is persisted.
pub mod config;
pub mod contract;
pub mod db_types;
mod dshop_api;
pub mod events;
pub mod helpers;
pub mod network;
pub mod order_data;
pub mod shop_config;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::EngineConfig;
pub use dshop_api::{
    errors::{IngestError, ReconcileError},
    ingest::EventIngestor,
    outcomes,
    reconciler::{refund_idempotency_key, OrderReconciler},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    Collaborators,
    EventStore,
    ExternalPaymentManagement,
    MarketplaceDatabase,
    MarketplaceDbError,
    OrderManagement,
    ShopManagement,
};
