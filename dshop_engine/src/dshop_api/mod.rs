//! # dshop engine public API
//!
//! * [`ingest`] is the entrypoint for raw marketplace logs. It decodes them, stores them and hands them to the
//!   reconciler, one offer at a time.
//! * [`reconciler`] is the order state machine. It maps a stored event onto the order store and drives the side
//!   effects (refunds, fulfillment, notifications) that go with each transition.
//! * [`outcomes`] describes what happened to each event. [`errors`] describes what went wrong.
//!
//! # API usage
//!
//! ```rust,ignore
//! use dshop_engine::{network::NetworkRegistry, EngineConfig, EventIngestor, OrderReconciler, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let reconciler = OrderReconciler::new(db, collaborators, EngineConfig::from_env_or_default());
//! let ingestor = EventIngestor::new(reconciler, NetworkRegistry::from_env_or_default());
//! let outcome = ingestor.ingest(1, "001", raw_log).await?;
//! ```
pub mod errors;
pub mod ingest;
mod listings;
mod new_order;
pub mod outcomes;
pub mod reconciler;
