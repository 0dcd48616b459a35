//! #  Database management and external collaborators.
//!
//! This module provides the interface contracts of the engine's database *backends* and of the external systems the
//! engine drives.
//!
//! ## Database traits
//! * [`MarketplaceDatabase`] is the umbrella trait a backend must implement to be usable by the engine.
//! * [`EventStore`] keeps the append-only record of every marketplace log the engine has seen.
//! * [`ShopManagement`] resolves shops by listing id or by the wallet that is about to create their listing.
//! * [`OrderManagement`] stores and mutates orders.
//! * [`ExternalPaymentManagement`] gives read access to the payments taken by external gateways.
//!
//! ## Collaborators
//! Content storage, offer decryption, discounts, refunds, fulfillment, notifications and the shop configuration files
//! all live outside the engine. They are modelled as object-safe async traits and bundled together in
//! [`Collaborators`].
mod collaborators;
mod event_store;
mod marketplace_database;
mod order_management;
mod shop_management;

pub use collaborators::{
    CollaboratorError,
    Collaborators,
    ContentFetcher,
    DiscountValidation,
    DiscountValidator,
    FulfillmentService,
    NotificationDispatcher,
    OfferDecryptor,
    RefundProcessor,
    RefundResult,
    ShopConfigStore,
};
pub use event_store::EventStore;
pub use marketplace_database::{MarketplaceDatabase, MarketplaceDbError};
pub use order_management::{ExternalPaymentManagement, OrderManagement};
pub use shop_management::ShopManagement;
