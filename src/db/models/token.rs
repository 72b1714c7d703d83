use serde::{Deserialize, Serialize};

use crate::db::Entity;

/// ERC20 token metadata.
///
/// Primary Key: address
/// Decimals fall back to 0 when the contract does not answer `decimals()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: String, symbol: String, name: String, decimals: u8) -> Self {
        Self {
            // Always lowercase addresses for consistent comparisons
            address: address.to_lowercase(),
            symbol,
            name,
            decimals,
        }
    }
}

impl Entity for Token {
    const KIND: &'static str = "token";

    fn id(&self) -> String {
        self.address.clone()
    }
}
