//! Scripted chain used by unit tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};

use crate::chain::{ChainReader, SwapStorage, TokenMetadata};

/// Raw amount of `units` whole tokens at 18 decimals.
pub fn ether(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
}

/// Deterministic non-zero test address.
pub fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// A plain or meta pool. `None` slots revert.
#[derive(Debug, Clone, Default)]
pub struct MockPool {
    pub tokens: Vec<Option<Address>>,
    pub balances: Vec<Option<U256>>,
    pub a: U256,
    pub swap_fee: U256,
    pub admin_fee: U256,
    pub lp_token: Address,
    pub virtual_price: U256,
    pub owner: Address,
    pub base: Option<Address>,
}

impl MockPool {
    pub fn new(tokens: &[Address], balances: &[U256]) -> Self {
        Self {
            tokens: tokens.iter().copied().map(Some).collect(),
            balances: balances.iter().copied().map(Some).collect(),
            a: U256::from(200u64),
            swap_fee: U256::from(4_000_000u64),
            admin_fee: U256::from(5_000_000_000u64),
            lp_token: addr(0xee),
            virtual_price: ether(1),
            owner: addr(0xef),
            base: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockWrapper {
    pub coins: Vec<Option<Address>>,
    pub base_pool: Address,
    pub lp_token: Address,
    pub price_oracle: U256,
    pub owner: Address,
}

#[derive(Debug, Clone, Default)]
pub struct MockErc20 {
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
    pub balances: HashMap<Address, U256>,
    /// `balanceOf` reverts.
    pub broken: bool,
}

#[derive(Debug, Default)]
pub struct MockChain {
    pub pools: HashMap<Address, MockPool>,
    pub wrappers: HashMap<Address, MockWrapper>,
    pub erc20s: HashMap<Address, MockErc20>,
    /// Number of `getToken` probes served.
    pub token_probes: AtomicUsize,
    /// Number of `token_metadata` reads served.
    pub metadata_reads: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, address: Address, pool: MockPool) -> Self {
        self.pools.insert(address, pool);
        self
    }

    pub fn with_wrapper(mut self, address: Address, wrapper: MockWrapper) -> Self {
        self.wrappers.insert(address, wrapper);
        self
    }

    pub fn with_token(mut self, address: Address, symbol: &str, decimals: u8) -> Self {
        let token = self.erc20s.entry(address).or_default();
        token.symbol = Some(symbol.to_string());
        token.decimals = Some(decimals);
        self
    }

    pub fn pool_mut(&mut self, address: Address) -> &mut MockPool {
        self.pools.entry(address).or_default()
    }

    pub fn erc20_mut(&mut self, address: Address) -> &mut MockErc20 {
        self.erc20s.entry(address).or_default()
    }

    pub fn token_probes(&self) -> usize {
        self.token_probes.load(Ordering::SeqCst)
    }

    pub fn metadata_reads(&self) -> usize {
        self.metadata_reads.load(Ordering::SeqCst)
    }

    fn pool(&self, address: Address) -> Result<&MockPool> {
        self.pools
            .get(&address)
            .ok_or_else(|| anyhow!("no pool at {}", address))
    }

    fn wrapper(&self, address: Address) -> Result<&MockWrapper> {
        self.wrappers
            .get(&address)
            .ok_or_else(|| anyhow!("no wrapper at {}", address))
    }
}

impl ChainReader for MockChain {
    async fn get_token(&self, pool: Address, index: u8) -> Result<Option<Address>> {
        self.token_probes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pools
            .get(&pool)
            .and_then(|p| p.tokens.get(index as usize).copied().flatten()))
    }

    async fn get_token_balance(&self, pool: Address, index: u8) -> Result<Option<U256>> {
        Ok(self
            .pools
            .get(&pool)
            .and_then(|p| p.balances.get(index as usize).copied().flatten()))
    }

    async fn underlying_coin(&self, wrapper: Address, index: u64) -> Result<Option<Address>> {
        Ok(self
            .wrappers
            .get(&wrapper)
            .and_then(|w| w.coins.get(index as usize).copied().flatten()))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<Option<U256>> {
        Ok(match self.erc20s.get(&token) {
            Some(erc20) if !erc20.broken => {
                Some(erc20.balances.get(&owner).copied().unwrap_or_default())
            },
            _ => None,
        })
    }

    async fn token_metadata(&self, token: Address) -> TokenMetadata {
        self.metadata_reads.fetch_add(1, Ordering::SeqCst);
        match self.erc20s.get(&token) {
            Some(erc20) => TokenMetadata {
                symbol: erc20.symbol.clone(),
                name: erc20.symbol.clone(),
                decimals: erc20.decimals,
            },
            None => TokenMetadata::default(),
        }
    }

    async fn get_a(&self, pool: Address) -> Result<U256> {
        Ok(self.pool(pool)?.a)
    }

    async fn swap_storage(&self, pool: Address) -> Result<SwapStorage> {
        let pool = self.pool(pool)?;
        Ok(SwapStorage {
            swap_fee: pool.swap_fee,
            admin_fee: pool.admin_fee,
            lp_token: pool.lp_token,
        })
    }

    async fn virtual_price(&self, pool: Address) -> Result<U256> {
        Ok(self.pool(pool)?.virtual_price)
    }

    async fn owner(&self, contract: Address) -> Result<Address> {
        match self.pools.get(&contract) {
            Some(pool) => Ok(pool.owner),
            None => Ok(self.wrapper(contract)?.owner),
        }
    }

    async fn meta_swap_base(&self, pool: Address) -> Result<Address> {
        self.pool(pool)?
            .base
            .ok_or_else(|| anyhow!("{} is not a meta pool", pool))
    }

    async fn base_pool(&self, wrapper: Address) -> Result<Address> {
        Ok(self.wrapper(wrapper)?.base_pool)
    }

    async fn price_oracle(&self, wrapper: Address) -> Result<U256> {
        Ok(self.wrapper(wrapper)?.price_oracle)
    }

    async fn meta_lp_token(&self, wrapper: Address) -> Result<Address> {
        Ok(self.wrapper(wrapper)?.lp_token)
    }
}
