use std::str::FromStr;

use alloy_primitives::Address;

/// EIP-55 checksummed representation of an address.
pub fn to_checksum_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parses an address in any case and returns its checksummed form, or `None` if it isn't a valid address.
pub fn normalize_address(address: &str) -> Option<String> {
    Address::from_str(address.trim()).ok().map(|a| to_checksum_address(&a))
}
