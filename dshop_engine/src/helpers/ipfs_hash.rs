//! Conversion from the `bytes32` content hashes the contract emits to IPFS CIDv0 strings.
//!
//! A CIDv0 is the base58btc encoding of a sha2-256 multihash: the two-byte prefix `0x12 0x20` followed by the 32-byte
//! digest. The contract only stores the digest, so the prefix is added here.
use alloy_primitives::B256;

const MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// Returns the CIDv0 string for a content hash, or `None` for the all-zero hash (no content).
pub fn bytes32_to_ipfs_hash(hash: &B256) -> Option<String> {
    if hash.is_zero() {
        return None;
    }
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&MULTIHASH_PREFIX);
    bytes.extend_from_slice(hash.as_slice());
    Some(bs58::encode(bytes).into_string())
}
