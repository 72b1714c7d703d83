//! Token topology discovery for the three pool shapes.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use log::{debug, warn};

use crate::{chain::ChainReader, db::models::PoolShape};

/// Upper bound on probed indices. Pools index coins by `uint8`.
const MAX_PROBED_COINS: usize = 256;

/// Everything read from chain when a pool is first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTopology {
    pub address: Address,
    pub shape: PoolShape,
    pub base_swap_address: Address,
    pub tokens: Vec<Address>,
    pub base_tokens: Vec<Address>,
    pub all_tokens: Vec<Address>,
    pub balances: Vec<U256>,
    pub lp_token: Address,
    pub a: U256,
    pub swap_fee: U256,
    pub admin_fee: U256,
    pub virtual_price: U256,
    pub owner: Address,
}

/// Read a pool's tokens, balances and parameters.
pub async fn resolve<R: ChainReader>(
    reader: &R,
    address: Address,
    shape: PoolShape,
) -> Result<PoolTopology> {
    let topology = match shape {
        PoolShape::Plain => resolve_plain(reader, address).await,
        PoolShape::MetaPool => resolve_meta(reader, address).await,
        PoolShape::DepositWrapper => resolve_wrapper(reader, address).await,
    }
    .with_context(|| format!("Failed to resolve {} pool {}", shape.as_str(), address))?;

    debug!(
        "Resolved {} pool {}: {} tokens, {} base tokens, {} balances",
        shape.as_str(),
        address,
        topology.tokens.len(),
        topology.base_tokens.len(),
        topology.balances.len()
    );

    Ok(topology)
}

/// Read the current balance of every token of an existing pool, in order.
///
/// Unlike discovery, the token count is known here, so a failed read is an
/// error rather than the end of the list.
pub async fn read_balances<R: ChainReader>(
    reader: &R,
    address: Address,
    shape: PoolShape,
    tokens: &[Address],
) -> Result<Vec<U256>> {
    let mut balances = Vec::with_capacity(tokens.len());

    for (index, token) in tokens.iter().enumerate() {
        let balance = match shape {
            PoolShape::Plain | PoolShape::MetaPool => {
                let index = u8::try_from(index)
                    .with_context(|| format!("Token index {} out of range", index))?;
                reader.get_token_balance(address, index).await?
            },
            PoolShape::DepositWrapper => reader.balance_of(*token, address).await?,
        };
        let balance = balance.with_context(|| {
            format!("Failed to read balance {} ({}) of pool {}", index, token, address)
        })?;
        balances.push(balance);
    }

    Ok(balances)
}

/// Meta pools hold the base pool's LP token in their last slot; the
/// flattened view replaces it with the base pool's own tokens.
pub fn flatten_meta_tokens(tokens: &[Address], base_tokens: &[Address]) -> Vec<Address> {
    let direct = &tokens[..tokens.len().saturating_sub(1)];
    direct.iter().chain(base_tokens).copied().collect()
}

async fn resolve_plain<R: ChainReader>(reader: &R, address: Address) -> Result<PoolTopology> {
    let (tokens, balances) = probe_pool_coins(reader, address).await?;
    let storage = reader.swap_storage(address).await?;

    Ok(PoolTopology {
        address,
        shape: PoolShape::Plain,
        base_swap_address: address,
        base_tokens: tokens.clone(),
        all_tokens: tokens.clone(),
        tokens,
        balances,
        lp_token: storage.lp_token,
        a: reader.get_a(address).await?,
        swap_fee: storage.swap_fee,
        admin_fee: storage.admin_fee,
        virtual_price: reader.virtual_price(address).await?,
        owner: reader.owner(address).await?,
    })
}

async fn resolve_meta<R: ChainReader>(reader: &R, address: Address) -> Result<PoolTopology> {
    let (tokens, balances) = probe_pool_coins(reader, address).await?;
    let base = reader.meta_swap_base(address).await?;
    let base_tokens = probe_tokens(reader, base).await?;
    let storage = reader.swap_storage(address).await?;

    Ok(PoolTopology {
        address,
        shape: PoolShape::MetaPool,
        base_swap_address: base,
        all_tokens: flatten_meta_tokens(&tokens, &base_tokens),
        tokens,
        base_tokens,
        balances,
        lp_token: storage.lp_token,
        a: reader.get_a(address).await?,
        swap_fee: storage.swap_fee,
        admin_fee: storage.admin_fee,
        virtual_price: reader.virtual_price(address).await?,
        owner: reader.owner(address).await?,
    })
}

/// Wrappers have no amplification or fees of their own; `virtual_price`
/// carries the wrapper's price oracle instead.
async fn resolve_wrapper<R: ChainReader>(reader: &R, address: Address) -> Result<PoolTopology> {
    let (tokens, balances) = probe_wrapper_coins(reader, address).await?;
    let base = reader.base_pool(address).await?;
    let base_tokens = probe_tokens(reader, base).await?;

    Ok(PoolTopology {
        address,
        shape: PoolShape::DepositWrapper,
        base_swap_address: base,
        all_tokens: tokens.clone(),
        tokens,
        base_tokens,
        balances,
        lp_token: reader.meta_lp_token(address).await?,
        a: U256::ZERO,
        swap_fee: U256::ZERO,
        admin_fee: U256::ZERO,
        virtual_price: reader.price_oracle(address).await?,
        owner: reader.owner(address).await?,
    })
}

/// Probe `getToken(i)` / `getTokenBalance(i)` from index 0 until either
/// fails. Nothing from the failing index is kept, so both lists are bounded
/// by the shorter successful run and stay aligned.
async fn probe_pool_coins<R: ChainReader>(
    reader: &R,
    pool: Address,
) -> Result<(Vec<Address>, Vec<U256>)> {
    let mut tokens = Vec::new();
    let mut balances = Vec::new();

    for index in 0..=u8::MAX {
        let token = reader.get_token(pool, index).await?;
        let balance = reader.get_token_balance(pool, index).await?;

        let (Some(token), Some(balance)) = (token, balance) else {
            return Ok((tokens, balances));
        };
        push_coin(&mut tokens, &mut balances, token, balance);
    }

    warn!("Pool {} answered all {} token probes", pool, MAX_PROBED_COINS);
    Ok((tokens, balances))
}

/// Wrapper variant: `UNDERLYING_COINS(i)`, then the coin's `balanceOf`
/// the wrapper. A failed coin probe counts as a failed balance probe.
async fn probe_wrapper_coins<R: ChainReader>(
    reader: &R,
    wrapper: Address,
) -> Result<(Vec<Address>, Vec<U256>)> {
    let mut tokens = Vec::new();
    let mut balances = Vec::new();

    for index in 0..MAX_PROBED_COINS as u64 {
        let Some(token) = reader.underlying_coin(wrapper, index).await? else {
            return Ok((tokens, balances));
        };
        let Some(balance) = reader.balance_of(token, wrapper).await? else {
            return Ok((tokens, balances));
        };
        push_coin(&mut tokens, &mut balances, token, balance);
    }

    warn!("Wrapper {} answered all {} coin probes", wrapper, MAX_PROBED_COINS);
    Ok((tokens, balances))
}

/// Token-only probe used for base pools.
async fn probe_tokens<R: ChainReader>(reader: &R, pool: Address) -> Result<Vec<Address>> {
    let mut tokens = Vec::new();

    for index in 0..=u8::MAX {
        match reader.get_token(pool, index).await? {
            Some(token) if token != Address::ZERO => tokens.push(token),
            Some(_) => {},
            None => return Ok(tokens),
        }
    }

    warn!("Base pool {} answered all {} token probes", pool, MAX_PROBED_COINS);
    Ok(tokens)
}

/// Zero-address slots are placeholders; their balance goes with them.
fn push_coin(
    tokens: &mut Vec<Address>,
    balances: &mut Vec<U256>,
    token: Address,
    balance: U256,
) {
    if token == Address::ZERO {
        debug!("Skipping zero-address coin slot {}", tokens.len());
        return;
    }
    tokens.push(token);
    balances.push(balance);
}
