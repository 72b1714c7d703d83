//! Contract reads needed by the indexer.
//!
//! Pool contracts expose no length accessor for their token arrays, so token
//! discovery probes indices until a call fails. Reads used that way are
//! *probes*: they return `Ok(None)` when the contract refused the call
//! (revert, empty or undecodable return data) and reserve `Err` for
//! transport trouble (connection errors, rate limits, timeouts), which must
//! not be mistaken for the end of an array. Every other read is *required*
//! and fails the event when it cannot be served.

use std::future::Future;

use alloy::primitives::{Address, U256};
use anyhow::Result;

mod rpc;

pub use rpc::RpcReader;

/// Fee fields of a pool's swap storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapStorage {
    pub swap_fee: U256,
    pub admin_fee: U256,
    pub lp_token: Address,
}

/// Whatever an ERC20 answered; missing fields fall back at the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
}

pub trait ChainReader: Send + Sync {
    // ---------------- probes ----------------

    /// `getToken(index)` on a plain or meta pool.
    fn get_token(
        &self,
        pool: Address,
        index: u8,
    ) -> impl Future<Output = Result<Option<Address>>> + Send;

    /// `getTokenBalance(index)` on a plain or meta pool.
    fn get_token_balance(
        &self,
        pool: Address,
        index: u8,
    ) -> impl Future<Output = Result<Option<U256>>> + Send;

    /// `UNDERLYING_COINS(index)` on a deposit wrapper.
    fn underlying_coin(
        &self,
        wrapper: Address,
        index: u64,
    ) -> impl Future<Output = Result<Option<Address>>> + Send;

    /// ERC20 `balanceOf(owner)`.
    fn balance_of(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<Option<U256>>> + Send;

    /// ERC20 `decimals()`, `symbol()`, `name()`. Never fails.
    fn token_metadata(&self, token: Address) -> impl Future<Output = TokenMetadata> + Send;

    // ---------------- required ----------------

    fn get_a(&self, pool: Address) -> impl Future<Output = Result<U256>> + Send;

    fn swap_storage(&self, pool: Address) -> impl Future<Output = Result<SwapStorage>> + Send;

    fn virtual_price(&self, pool: Address) -> impl Future<Output = Result<U256>> + Send;

    /// `owner()`; served by pools and wrappers alike.
    fn owner(&self, contract: Address) -> impl Future<Output = Result<Address>> + Send;

    /// Base pool linked from a meta pool's `metaSwapStorage()`.
    fn meta_swap_base(&self, pool: Address) -> impl Future<Output = Result<Address>> + Send;

    /// `BASE_POOL()` on a deposit wrapper.
    fn base_pool(&self, wrapper: Address) -> impl Future<Output = Result<Address>> + Send;

    /// `priceOracle()` on a deposit wrapper.
    fn price_oracle(&self, wrapper: Address) -> impl Future<Output = Result<U256>> + Send;

    /// `META_LPTOKEN()` on a deposit wrapper.
    fn meta_lp_token(&self, wrapper: Address) -> impl Future<Output = Result<Address>> + Send;
}
