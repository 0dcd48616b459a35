mod addresses;
mod commission;
pub mod ipfs_hash;
mod offer_locks;

pub use addresses::{normalize_address, to_checksum_address};
pub use commission::{referral_commission, COMMISSION_DIVISOR};
pub use offer_locks::OfferLocks;
