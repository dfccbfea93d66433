//! # Core Value Types
//!
//! Identities, digests and amounts as they appear on the root chain.

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

use crate::errors::AddressParseError;

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// A 20-byte EVM-style account address.
pub type Address = [u8; 20];

/// Root-chain block height.
pub type BlockNumber = u64;

/// The all-zero digest (root of an empty member set).
pub const ZERO_HASH: Hash = [0u8; 32];

/// Parse a `0x`-prefixed (or bare) 40 hex character address.
pub fn parse_address(input: &str) -> Result<Address, AddressParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(AddressParseError::InvalidLength {
            input: input.to_string(),
            got: digits.len(),
        });
    }

    let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);
    Ok(address)
}

/// Format an address as lowercase `0x`-prefixed hex.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Format a digest as lowercase `0x`-prefixed hex.
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// First four bytes of a digest, for log lines.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Encode an amount as 32 big-endian bytes (Solidity `uint256` layout).
pub fn u256_to_be_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}
