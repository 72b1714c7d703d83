use alloy::primitives::U256;
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::{db::Entity, events::EventContext, utils::parse_bigdecimal};

/// Contract family a pool address belongs to.
///
/// Declared per pool in configuration; selects the accessors used to discover
/// tokens and balances and the ABI used to decode the pool's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolShape {
    /// Stableswap pool holding its own tokens.
    Plain,
    /// Pool holding direct tokens plus the LP token of a base pool (last slot).
    MetaPool,
    /// Proxy exposing the underlying coins of a base pool.
    DepositWrapper,
}

impl PoolShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolShape::Plain => "plain",
            PoolShape::MetaPool => "meta_pool",
            PoolShape::DepositWrapper => "deposit_wrapper",
        }
    }
}

/// Stableswap pool metadata and current state.
///
/// Primary Key: address
///
/// Topology fields (`tokens`, `base_tokens`, `all_tokens`, `base_swap_address`,
/// `lp_token`) are fixed at creation. Balances, parameters, TVL and APY are
/// overwritten in place on every relevant event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub address: String,
    pub shape: PoolShape,

    // Topology
    pub base_swap_address: String,
    pub num_tokens: usize,
    pub tokens: Vec<String>,
    pub base_tokens: Vec<String>,
    pub all_tokens: Vec<String>,
    pub lp_token: String,

    // Reserves in native units, aligned with `tokens`
    pub balances: Vec<String>,

    // Parameters (fees are fractions over FEE_DENOMINATOR)
    pub a: String,
    pub swap_fee: String,
    pub admin_fee: String,
    pub withdraw_fee: String,
    pub virtual_price: String,
    pub owner: String,

    // Derived
    pub tvl: BigDecimal,
    pub apy: BigDecimal,

    // Activity tracking
    pub created_at_block: u64,
    pub created_at_timestamp: u64,
    pub updated_at_block: u64,
    pub updated_at_timestamp: u64,
    pub updated_at_transaction: String,
}

impl Entity for Pool {
    const KIND: &'static str = "pool";

    fn id(&self) -> String {
        self.address.clone()
    }
}

impl Pool {
    /// Overwrite the balances with a fresh on-chain read.
    pub fn set_balances(&mut self, balances: &[U256]) {
        self.balances = balances.iter().map(|b| b.to_string()).collect();
    }

    pub fn swap_fee_decimal(&self) -> Result<BigDecimal> {
        parse_bigdecimal(&self.swap_fee)
            .with_context(|| format!("Corrupt swap fee on pool {}", self.address))
    }

    /// Stamp the record with the event that last modified it.
    pub fn touch(&mut self, ctx: &EventContext) {
        self.updated_at_block = ctx.block_number;
        self.updated_at_timestamp = ctx.block_timestamp;
        self.updated_at_transaction = ctx.tx_hash.clone();
    }
}
