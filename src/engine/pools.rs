use alloy::primitives::{Address, U256};
use anyhow::Result;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use log::{info, warn};

use crate::{
    chain::ChainReader,
    db::{
        models::{Pool, PoolShape, SystemInfo, Token},
        Store,
    },
    engine::{topology, Indexer, PoolTopology},
    events::EventContext,
    utils::{address_to_string, parse_address},
};

impl<R: ChainReader, S: Store> Indexer<R, S> {
    /// Load the pool, or read its topology from chain and create it.
    ///
    /// Creation registers every token the pool references and bumps the
    /// global pool counter; an existing pool is returned untouched and
    /// causes no chain reads.
    pub async fn get_or_create_pool(
        &mut self,
        address: Address,
        shape: PoolShape,
        ctx: &EventContext,
    ) -> Result<Pool> {
        let id = address_to_string(address);

        if let Some(pool) = self.store.load::<Pool>(&id).await? {
            if pool.shape != shape {
                warn!(
                    "Pool {} stored as {} but configured as {}",
                    id,
                    pool.shape.as_str(),
                    shape.as_str()
                );
            }
            return Ok(pool);
        }

        let topology = topology::resolve(&self.reader, address, shape).await?;

        for addresses in [&topology.tokens, &topology.base_tokens, &topology.all_tokens] {
            self.tokens
                .resolve_all(&self.reader, &mut self.store, addresses)
                .await?;
        }

        let pool = new_pool(&topology, ctx);
        self.store.upsert(&pool).await?;
        self.update_system(ctx, |system| system.pool_count += 1).await?;

        info!(
            "Created {} pool {} with {} tokens at block {}",
            shape.as_str(),
            pool.address,
            pool.num_tokens,
            ctx.block_number
        );

        Ok(pool)
    }

    /// Current balances of every token the pool holds, aligned with
    /// `pool.tokens`.
    pub async fn refresh_balances(&self, pool: &Pool) -> Result<Vec<U256>> {
        let address = parse_address(&pool.address)?;
        let tokens = pool
            .tokens
            .iter()
            .map(|token| parse_address(token))
            .collect::<Result<Vec<_>>>()?;
        topology::read_balances(&self.reader, address, pool.shape, &tokens).await
    }

    /// Token records for stored token ids, in order.
    pub(crate) async fn tokens_by_id(&mut self, ids: &[String]) -> Result<Vec<Token>> {
        let addresses = ids
            .iter()
            .map(|id| parse_address(id))
            .collect::<Result<Vec<_>>>()?;
        self.tokens
            .resolve_all(&self.reader, &mut self.store, &addresses)
            .await
    }

    pub(crate) async fn update_system<F>(&mut self, ctx: &EventContext, update: F) -> Result<()>
    where
        F: FnOnce(&mut SystemInfo),
    {
        let mut system = self
            .store
            .load::<SystemInfo>(SystemInfo::ID)
            .await?
            .unwrap_or_default();
        update(&mut system);
        system.touch(ctx);
        self.store.upsert(&system).await
    }
}

fn addresses_to_strings(addresses: &[Address]) -> Vec<String> {
    addresses.iter().copied().map(address_to_string).collect()
}

fn new_pool(topology: &PoolTopology, ctx: &EventContext) -> Pool {
    let mut pool = Pool {
        address: address_to_string(topology.address),
        shape: topology.shape,
        base_swap_address: address_to_string(topology.base_swap_address),
        num_tokens: topology.tokens.len(),
        tokens: addresses_to_strings(&topology.tokens),
        base_tokens: addresses_to_strings(&topology.base_tokens),
        all_tokens: addresses_to_strings(&topology.all_tokens),
        lp_token: address_to_string(topology.lp_token),
        balances: Vec::new(),
        a: topology.a.to_string(),
        swap_fee: topology.swap_fee.to_string(),
        admin_fee: topology.admin_fee.to_string(),
        withdraw_fee: "0".to_string(),
        virtual_price: topology.virtual_price.to_string(),
        owner: address_to_string(topology.owner),
        tvl: BigDecimal::zero(),
        apy: BigDecimal::zero(),
        created_at_block: ctx.block_number,
        created_at_timestamp: ctx.block_timestamp,
        updated_at_block: ctx.block_number,
        updated_at_timestamp: ctx.block_timestamp,
        updated_at_transaction: ctx.tx_hash.clone(),
    };
    pool.set_balances(&topology.balances);
    pool
}
