//! Utility functions for the Reservoir indexer.
//!
//! - [`conversion`] - Type conversions (U256, BigDecimal, hex encoding, stored strings)

mod conversion;

pub use conversion::{
    address_to_string, hex_encode, parse_address, parse_bigdecimal, parse_u256, u256_to_decimal,
    u256_to_scaled_decimal,
};
