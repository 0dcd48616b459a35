use crate::{
    db_types::{ExternalPayment, NewOrder, OfferId, Order, OrderUpdate},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order for the given offer in the given shop.
    async fn fetch_order(
        &self,
        network_id: i64,
        shop_id: i64,
        order_id: &OfferId,
    ) -> Result<Option<Order>, MarketplaceDbError>;

    /// Fetches an order by its internal id.
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, MarketplaceDbError>;

    /// Stores a new order. This call is idempotent on `(network_id, shop_id, order_id)`.
    ///
    /// Returns the stored order, and true if it was inserted, or false if it already existed. An existing order is
    /// returned unchanged.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), MarketplaceDbError>;

    /// Applies the update to the order with the given internal id and returns the new record.
    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, MarketplaceDbError>;

    /// All orders for the shop, oldest first.
    async fn fetch_orders_for_shop(&self, shop_id: i64) -> Result<Vec<Order>, MarketplaceDbError>;
}

/// Read access to payments taken by external gateways. The engine never writes these.
#[allow(async_fn_in_trait)]
pub trait ExternalPaymentManagement {
    async fn fetch_external_payment(&self, payment_code: &str) -> Result<Option<ExternalPayment>, MarketplaceDbError>;
}
