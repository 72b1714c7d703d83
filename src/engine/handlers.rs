use std::mem;

use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

use crate::{
    chain::ChainReader,
    db::{
        models::{
            LiquidityAction, LiquidityEvent, ParameterChange, Pool, PoolParameter, TokenExchange,
        },
        Store,
    },
    engine::{
        metrics::{compute_apy, compute_tvl, trade_volume},
        volume, Indexer,
    },
    events::{ChainEvent, EventContext, EventKind},
    utils::address_to_string,
};

/// A decoded trade.
struct Trade {
    buyer: Address,
    sold_id: u64,
    tokens_sold: U256,
    bought_id: u64,
    tokens_bought: U256,
    underlying: bool,
    price: Option<U256>,
}

/// A decoded deposit or withdrawal.
struct Liquidity {
    action: LiquidityAction,
    provider: Address,
    amounts: Amounts,
    fees: Vec<U256>,
    invariant: Option<U256>,
    lp_token_supply: Option<U256>,
    price: Option<U256>,
}

enum Amounts {
    PerToken(Vec<U256>),
    /// Single-sided withdrawal of `amount` of token `index`.
    Single { index: u64, amount: U256 },
}

impl Amounts {
    fn into_per_token(self, num_tokens: usize) -> Vec<U256> {
        match self {
            Amounts::PerToken(amounts) => amounts,
            Amounts::Single { index, amount } => {
                let mut amounts = vec![U256::ZERO; num_tokens];
                if let Some(slot) = usize::try_from(index).ok().and_then(|i| amounts.get_mut(i)) {
                    *slot = amount;
                }
                amounts
            },
        }
    }
}

fn to_strings(values: &[U256]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl<R: ChainReader, S: Store> Indexer<R, S> {
    /// Apply one pool event.
    ///
    /// Errors are fatal for the stream: the event has not been (fully)
    /// applied and must be redelivered after a restart.
    pub async fn handle_event(&mut self, event: &ChainEvent) -> Result<()> {
        debug!(
            "{} on {} at block {} (tx {}, log {})",
            event.kind.name(),
            event.pool,
            event.ctx.block_number,
            event.ctx.tx_hash,
            event.ctx.log_index
        );

        let result = match &event.kind {
            EventKind::TokenSwap {
                buyer,
                sold_id,
                tokens_sold,
                bought_id,
                tokens_bought,
                underlying,
                price,
            } => {
                let trade = Trade {
                    buyer: *buyer,
                    sold_id: *sold_id,
                    tokens_sold: *tokens_sold,
                    bought_id: *bought_id,
                    tokens_bought: *tokens_bought,
                    underlying: *underlying,
                    price: *price,
                };
                self.on_trade(event, trade).await
            },
            EventKind::AddLiquidity {
                provider,
                token_amounts,
                fees,
                invariant,
                lp_token_supply,
                price,
            } => {
                let liquidity = Liquidity {
                    action: LiquidityAction::Add,
                    provider: *provider,
                    amounts: Amounts::PerToken(token_amounts.clone()),
                    fees: fees.clone(),
                    invariant: *invariant,
                    lp_token_supply: *lp_token_supply,
                    price: *price,
                };
                self.on_liquidity(event, liquidity).await
            },
            EventKind::RemoveLiquidity {
                provider,
                token_amounts,
                lp_token_supply,
                price,
            } => {
                let liquidity = Liquidity {
                    action: LiquidityAction::Remove,
                    provider: *provider,
                    amounts: Amounts::PerToken(token_amounts.clone()),
                    fees: Vec::new(),
                    invariant: None,
                    lp_token_supply: *lp_token_supply,
                    price: *price,
                };
                self.on_liquidity(event, liquidity).await
            },
            EventKind::RemoveLiquidityOne {
                provider,
                index,
                amount,
                lp_token_supply,
                price,
            } => {
                let liquidity = Liquidity {
                    action: LiquidityAction::RemoveOne,
                    provider: *provider,
                    amounts: Amounts::Single {
                        index: *index,
                        amount: *amount,
                    },
                    fees: Vec::new(),
                    invariant: None,
                    lp_token_supply: *lp_token_supply,
                    price: *price,
                };
                self.on_liquidity(event, liquidity).await
            },
            EventKind::RemoveLiquidityImbalance {
                provider,
                token_amounts,
                fees,
                invariant,
                lp_token_supply,
            } => {
                let liquidity = Liquidity {
                    action: LiquidityAction::RemoveImbalance,
                    provider: *provider,
                    amounts: Amounts::PerToken(token_amounts.clone()),
                    fees: fees.clone(),
                    invariant: Some(*invariant),
                    lp_token_supply: Some(*lp_token_supply),
                    price: None,
                };
                self.on_liquidity(event, liquidity).await
            },
            EventKind::NewAdminFee { .. }
            | EventKind::NewSwapFee { .. }
            | EventKind::NewWithdrawFee { .. }
            | EventKind::RampA { .. }
            | EventKind::StopRampA { .. } => self.on_parameter(event).await,
        };

        result.with_context(|| {
            format!(
                "Failed to handle {} on {} at block {} (tx {})",
                event.kind.name(),
                event.pool,
                event.ctx.block_number,
                event.ctx.tx_hash
            )
        })
    }

    /// Refresh balances and everything derived from them: TVL, today's TVL
    /// snapshot and APY over today's volume.
    async fn refresh_pool_metrics(
        &mut self,
        pool: &mut Pool,
        ctx: &EventContext,
        price: Option<U256>,
    ) -> Result<()> {
        let balances = self.refresh_balances(pool).await?;
        pool.set_balances(&balances);

        let tokens = self.tokens_by_id(&pool.tokens).await?;
        pool.tvl = compute_tvl(&self.pricing, &tokens, &balances, price);
        volume::snapshot_daily_tvl(&mut self.store, &pool.address, ctx.block_timestamp, &pool.tvl)
            .await?;

        let daily_volume =
            volume::daily_volume(&mut self.store, &pool.address, ctx.block_timestamp).await?;
        pool.apy = compute_apy(&daily_volume, &pool.swap_fee_decimal()?, &pool.tvl);

        Ok(())
    }

    async fn on_trade(&mut self, event: &ChainEvent, trade: Trade) -> Result<()> {
        let ctx = &event.ctx;
        let mut pool = self.get_or_create_pool(event.pool, event.shape, ctx).await?;

        let exchange_id = TokenExchange::id_for(ctx);
        let redelivered = self
            .store
            .load::<TokenExchange>(&exchange_id)
            .await?
            .is_some();

        if redelivered {
            debug!("Exchange {} already applied, skipping volume", exchange_id);
        } else {
            self.accrue_trade_volume(&pool, ctx, &trade).await?;
        }

        self.refresh_pool_metrics(&mut pool, ctx, trade.price).await?;
        pool.touch(ctx);
        self.store.upsert(&pool).await?;

        if !redelivered {
            self.update_system(ctx, |system| system.exchange_count += 1).await?;
        }

        // Written last: its presence marks the trade as fully applied
        let exchange = TokenExchange {
            id: exchange_id,
            pool: pool.address.clone(),
            buyer: address_to_string(trade.buyer),
            sold_id: trade.sold_id,
            tokens_sold: trade.tokens_sold.to_string(),
            bought_id: trade.bought_id,
            tokens_bought: trade.tokens_bought.to_string(),
            underlying: trade.underlying,
            block: ctx.block_number,
            timestamp: ctx.block_timestamp,
            transaction: ctx.tx_hash.clone(),
        };
        self.store.upsert(&exchange).await
    }

    async fn accrue_trade_volume(
        &mut self,
        pool: &Pool,
        ctx: &EventContext,
        trade: &Trade,
    ) -> Result<()> {
        // Underlying swaps index the flattened token set
        let tokens = if trade.underlying {
            &pool.all_tokens
        } else {
            &pool.tokens
        };

        let lookup = |index: u64| usize::try_from(index).ok().and_then(|i| tokens.get(i));
        let (Some(sold), Some(bought)) = (lookup(trade.sold_id), lookup(trade.bought_id)) else {
            warn!(
                "Trade on {} references token ids {}/{} outside {} tokens, no volume recorded",
                pool.address,
                trade.sold_id,
                trade.bought_id,
                tokens.len()
            );
            return Ok(());
        };

        let legs = self.tokens_by_id(&[sold.clone(), bought.clone()]).await?;
        let volume = trade_volume(
            &self.pricing,
            (&legs[0], trade.tokens_sold),
            (&legs[1], trade.tokens_bought),
            trade.price,
        );

        volume::accrue(&mut self.store, &pool.address, ctx.block_timestamp, &volume).await
    }

    async fn on_liquidity(&mut self, event: &ChainEvent, liquidity: Liquidity) -> Result<()> {
        let ctx = &event.ctx;
        let mut pool = self.get_or_create_pool(event.pool, event.shape, ctx).await?;

        self.refresh_pool_metrics(&mut pool, ctx, liquidity.price).await?;
        pool.touch(ctx);
        self.store.upsert(&pool).await?;

        let record = LiquidityEvent {
            id: LiquidityEvent::id_for(liquidity.action, ctx),
            pool: pool.address.clone(),
            action: liquidity.action,
            provider: address_to_string(liquidity.provider),
            token_amounts: to_strings(&liquidity.amounts.into_per_token(pool.num_tokens)),
            fees: to_strings(&liquidity.fees),
            invariant: liquidity.invariant.unwrap_or_default().to_string(),
            lp_token_supply: liquidity.lp_token_supply.unwrap_or_default().to_string(),
            block: ctx.block_number,
            timestamp: ctx.block_timestamp,
            transaction: ctx.tx_hash.clone(),
        };
        self.store.upsert(&record).await
    }

    async fn on_parameter(&mut self, event: &ChainEvent) -> Result<()> {
        let ctx = &event.ctx;
        let mut pool = self.get_or_create_pool(event.pool, event.shape, ctx).await?;

        let change = |parameter: PoolParameter, old_value: Option<String>, new_value: &U256| {
            ParameterChange {
                id: ParameterChange::id_for(parameter, ctx),
                pool: address_to_string(event.pool),
                parameter,
                old_value,
                new_value: new_value.to_string(),
                initial_time: None,
                future_time: None,
                block: ctx.block_number,
                timestamp: ctx.block_timestamp,
                transaction: ctx.tx_hash.clone(),
            }
        };

        let record = match &event.kind {
            EventKind::NewAdminFee { new_fee } => {
                let old = mem::replace(&mut pool.admin_fee, new_fee.to_string());
                change(PoolParameter::AdminFee, Some(old), new_fee)
            },
            EventKind::NewSwapFee { new_fee } => {
                let old = mem::replace(&mut pool.swap_fee, new_fee.to_string());
                change(PoolParameter::SwapFee, Some(old), new_fee)
            },
            EventKind::NewWithdrawFee { new_fee } => {
                let old = mem::replace(&mut pool.withdraw_fee, new_fee.to_string());
                change(PoolParameter::WithdrawFee, Some(old), new_fee)
            },
            EventKind::RampA {
                old_a,
                new_a,
                initial_time,
                future_time,
            } => {
                // A moves gradually; the stored value changes on StopRampA
                info!(
                    "Pool {} ramping A {} -> {} until {}",
                    pool.address, old_a, new_a, future_time
                );
                let mut record = change(PoolParameter::RampA, Some(old_a.to_string()), new_a);
                record.initial_time = Some(initial_time.saturating_to::<u64>());
                record.future_time = Some(future_time.saturating_to::<u64>());
                record
            },
            EventKind::StopRampA { current_a, time } => {
                let old = mem::replace(&mut pool.a, current_a.to_string());
                let mut record = change(PoolParameter::StopRampA, Some(old), current_a);
                record.initial_time = Some(time.saturating_to::<u64>());
                record
            },
            other => bail!("{} is not a parameter event", other.name()),
        };

        pool.touch(ctx);
        self.store.upsert(&pool).await?;
        self.store.upsert(&record).await
    }
}
