use crate::{
    db_types::{ListingId, Shop},
    traits::MarketplaceDbError,
};

#[allow(async_fn_in_trait)]
pub trait ShopManagement {
    async fn fetch_shop(&self, shop_id: i64) -> Result<Option<Shop>, MarketplaceDbError>;

    /// Fetches the shop that owns the fully-qualified listing id, if any.
    async fn fetch_shop_by_listing_id(&self, listing_id: &ListingId) -> Result<Option<Shop>, MarketplaceDbError>;

    /// Fetches the shop that is waiting for its listing to be created by `wallet`.
    ///
    /// A pending shop has no listing id yet. The wallet is matched case-insensitively. If more than one shop is
    /// pending for the wallet, the most recently updated one wins, and then the one with the highest id.
    async fn fetch_pending_shop_for_wallet(&self, wallet: &str) -> Result<Option<Shop>, MarketplaceDbError>;

    /// Sets the listing id on the shop and returns the updated record.
    async fn assign_listing_id(&self, shop_id: i64, listing_id: &ListingId) -> Result<Shop, MarketplaceDbError>;
}
