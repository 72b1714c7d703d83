//! Type conversion and formatting utilities.
//!
//! Raw on-chain integers are persisted as base-10 strings and converted to
//! [`BigDecimal`] only when a derived metric needs them, so no precision is
//! lost between the chain and the store.

use alloy::primitives::{hex, Address, U256};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use once_cell::sync::Lazy;
use std::str::FromStr;

// ============================================
// Hex Encoding
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Lowercase string form of an address, used as entity id everywhere.
pub fn address_to_string(address: Address) -> String {
    hex_encode(address.as_slice())
}

/// Parse a stored (or configured) address string.
pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value).with_context(|| format!("Invalid address: {}", value))
}

// ============================================
// U256 Conversions
// ============================================

/// Convert a raw token amount into common-denomination units.
///
/// Exact: the integer becomes the unscaled value of a decimal whose scale is
/// `decimals`, so `1000 * 10^18` with 18 decimals is exactly `1000`.
///
/// # Example
/// ```ignore
/// let value = U256::from(1_500_000u64);
/// assert_eq!(u256_to_decimal(value, 6), BigDecimal::from_str("1.5").unwrap());
/// ```
pub fn u256_to_decimal(value: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(u256_to_bigint(value), i64::from(decimals))
}

/// Convert a raw integer into a decimal after dividing by `10^decimals`.
///
/// Same as [`u256_to_decimal`] but accepts scales beyond `u8` used for
/// configured price precision.
pub fn u256_to_scaled_decimal(value: U256, decimals: u32) -> BigDecimal {
    if decimals == 0 {
        return BigDecimal::from(u256_to_bigint(value));
    }
    BigDecimal::from(u256_to_bigint(value)) / big_pow10(decimals)
}

fn u256_to_bigint(value: U256) -> BigInt {
    // Via bytes, faster than string parsing
    let bytes: [u8; 32] = value.to_le_bytes();
    BigInt::from_bytes_le(Sign::Plus, &bytes)
}

// ============================================
// Stored String Conversions
// ============================================

/// Parse a base-10 string stored on an entity into a BigDecimal.
pub fn parse_bigdecimal(value: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(value).with_context(|| format!("Invalid decimal: {}", value))
}

/// Parse a base-10 integer string stored on an entity.
pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str_radix(value, 10).with_context(|| format!("Invalid integer: {}", value))
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u32) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_to_decimal_is_exact() {
        let raw = U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(u256_to_decimal(raw, 18), BigDecimal::from(1000));

        let usdc = U256::from(1_500_000u64);
        assert_eq!(
            u256_to_decimal(usdc, 6),
            BigDecimal::from_str("1.5").unwrap()
        );
    }

    #[test]
    fn test_zero_decimals_keeps_raw_value() {
        assert_eq!(u256_to_decimal(U256::from(42u64), 0), BigDecimal::from(42));
        assert_eq!(
            u256_to_scaled_decimal(U256::from(42u64), 0),
            BigDecimal::from(42)
        );
    }

    #[test]
    fn test_scaled_decimal() {
        let price = U256::from(7_250_000_000_000_000u64);
        assert_eq!(
            u256_to_scaled_decimal(price, 18),
            BigDecimal::from_str("0.00725").unwrap()
        );
    }

    #[test]
    fn test_parse_stored_decimal() {
        assert!(parse_bigdecimal("not a number").is_err());
        assert_eq!(
            parse_bigdecimal("0.0004").unwrap(),
            BigDecimal::from_str("0.0004").unwrap()
        );
    }

    #[test]
    fn test_address_strings_are_lowercase() {
        let address =
            parse_address("0x431D5dfF03120AFA4bDf332c61A6e1766eF37BDB").unwrap();
        assert_eq!(
            address_to_string(address),
            "0x431d5dff03120afa4bdf332c61a6e1766ef37bdb"
        );
    }
}
