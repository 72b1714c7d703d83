//! Log parsing module for HyperSync logs.
//!
//! Decodes raw logs emitted by configured pools into [`ChainEvent`]s. The
//! ABI used depends on the pool's configured shape: plain and meta pools
//! share the swap event set (meta pools add `TokenSwapUnderlying`), deposit
//! wrappers emit their own price-carrying variants. `Deposit` logs of the
//! configured voting escrow become [`LockDeposit`]s.

use alloy::{
    primitives::{Address, LogData, B256},
    sol_types::SolEvent,
};
use log::warn;
use rustc_hash::FxHashMap;

use crate::{
    abis::{meta_swap, swap, voting_escrow, xswap_deposit},
    db::models::PoolShape,
    events::{ChainEvent, EventContext, EventKind, LockDeposit},
    utils::hex_encode,
    worker::IndexMessage,
};

/// Contracts whose logs are indexed.
#[derive(Debug, Clone, Default)]
pub struct Emitters {
    pub pools: FxHashMap<Address, PoolShape>,
    pub voting_escrow: Option<Address>,
}

impl Emitters {
    pub fn addresses(&self) -> Vec<Address> {
        self.pools.keys().copied().chain(self.voting_escrow).collect()
    }
}

/// Every topic0 the indexer subscribes to.
pub fn subscribed_topics() -> Vec<[u8; 32]> {
    vec![
        swap::TokenSwap::SIGNATURE_HASH.0,
        swap::AddLiquidity::SIGNATURE_HASH.0,
        swap::RemoveLiquidity::SIGNATURE_HASH.0,
        swap::RemoveLiquidityOne::SIGNATURE_HASH.0,
        swap::RemoveLiquidityImbalance::SIGNATURE_HASH.0,
        swap::NewAdminFee::SIGNATURE_HASH.0,
        swap::NewSwapFee::SIGNATURE_HASH.0,
        swap::NewWithdrawFee::SIGNATURE_HASH.0,
        swap::RampA::SIGNATURE_HASH.0,
        swap::StopRampA::SIGNATURE_HASH.0,
        meta_swap::TokenSwapUnderlying::SIGNATURE_HASH.0,
        xswap_deposit::TokenExchange::SIGNATURE_HASH.0,
        xswap_deposit::AddLiquidity::SIGNATURE_HASH.0,
        // xswap_deposit::RemoveLiquidity shares its signature with swap::RemoveLiquidity
        xswap_deposit::RemoveLiquidityOne::SIGNATURE_HASH.0,
        voting_escrow::Deposit::SIGNATURE_HASH.0,
    ]
}

/// Parse HyperSync logs into processor messages, in log order.
///
/// Logs from addresses that are not configured emitters, logs whose topic
/// does not belong to the emitter, and logs of blocks without a known
/// timestamp are dropped.
pub fn parse_logs(
    logs: impl Iterator<Item = hypersync_client::simple_types::Log>,
    block_timestamps: &FxHashMap<u64, u64>,
    emitters: &Emitters,
) -> Vec<IndexMessage> {
    let mut messages = Vec::new();

    for log in logs {
        // Ignore logs without topics
        if log.topics.is_empty() {
            continue;
        }

        let Some(emitter) = log.address.as_ref().map(|a| Address::from_slice(a.as_ref())) else {
            continue;
        };
        let shape = emitters.pools.get(&emitter).copied();
        if shape.is_none() && emitters.voting_escrow != Some(emitter) {
            continue;
        }

        // Parse the log data as raw bytes
        let data = log
            .data
            .as_ref()
            .map(|d| d.as_ref().to_vec())
            .unwrap_or_default()
            .into();

        // Parse the log topics as alloy B256
        let topics: Vec<B256> = log
            .topics
            .iter()
            .flatten()
            .map(|t| B256::from_slice(t.as_ref()))
            .collect();

        let log_data = LogData::new_unchecked(topics, data);

        let tx_hash = log
            .transaction_hash
            .as_ref()
            .map(|h| hex_encode(h.as_ref()))
            .unwrap_or_default();

        let block_number: u64 = log.block_number.map(|x| x.into()).unwrap_or(0);

        let log_index = log
            .log_index
            .map(|i| {
                let v: u64 = i.into();
                v as u32
            })
            .unwrap_or(0);

        // Bucket keys derive from the timestamp, never guess it
        let Some(block_timestamp) = block_timestamps.get(&block_number).copied() else {
            warn!(
                "Dropping log {} of tx {} from {}: no timestamp for block {}",
                log_index, tx_hash, emitter, block_number
            );
            continue;
        };

        let ctx = EventContext {
            block_number,
            block_timestamp,
            tx_hash,
            log_index,
        };

        match shape {
            Some(shape) => {
                if let Some(kind) = decode_event(shape, &log_data) {
                    messages.push(IndexMessage::Event(ChainEvent {
                        pool: emitter,
                        shape,
                        ctx,
                        kind,
                    }));
                }
            },
            None => {
                if let Some(deposit) = decode_lock_deposit(emitter, ctx, &log_data) {
                    messages.push(IndexMessage::Lock(deposit));
                }
            },
        }
    }

    messages
}

/// Decode one log of a pool with the given shape.
pub fn decode_event(shape: PoolShape, log_data: &LogData) -> Option<EventKind> {
    match shape {
        PoolShape::Plain => decode_swap_event(log_data, false),
        PoolShape::MetaPool => decode_swap_event(log_data, true),
        PoolShape::DepositWrapper => decode_wrapper_event(log_data),
    }
}

/// Decode a voting escrow log; only `Deposit` is indexed.
pub fn decode_lock_deposit(
    escrow: Address,
    ctx: EventContext,
    log_data: &LogData,
) -> Option<LockDeposit> {
    let topic0 = log_data.topics().first()?;
    if topic0 != &voting_escrow::Deposit::SIGNATURE_HASH.0 {
        return None;
    }

    let event = decode::<voting_escrow::Deposit>(log_data)?;
    Some(LockDeposit {
        escrow,
        ctx,
        provider: event.provider,
        value: event.value,
        locktime: event.locktime,
        ts: event.ts,
    })
}

fn decode<E: SolEvent>(log_data: &LogData) -> Option<E> {
    match E::decode_log_data(log_data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Failed to decode {}: {}", E::SIGNATURE, e);
            None
        },
    }
}

fn decode_swap_event(log_data: &LogData, meta: bool) -> Option<EventKind> {
    let topic0 = log_data.topics().first()?;

    match topic0 {
        t if t == &swap::TokenSwap::SIGNATURE_HASH.0 => {
            let event = decode::<swap::TokenSwap>(log_data)?;
            Some(EventKind::TokenSwap {
                buyer: event.buyer,
                sold_id: u64::try_from(event.soldId).unwrap_or(u64::MAX),
                tokens_sold: event.tokensSold,
                bought_id: u64::try_from(event.boughtId).unwrap_or(u64::MAX),
                tokens_bought: event.tokensBought,
                underlying: false,
                price: None,
            })
        },
        t if meta && t == &meta_swap::TokenSwapUnderlying::SIGNATURE_HASH.0 => {
            let event = decode::<meta_swap::TokenSwapUnderlying>(log_data)?;
            Some(EventKind::TokenSwap {
                buyer: event.buyer,
                sold_id: u64::try_from(event.soldId).unwrap_or(u64::MAX),
                tokens_sold: event.tokensSold,
                bought_id: u64::try_from(event.boughtId).unwrap_or(u64::MAX),
                tokens_bought: event.tokensBought,
                underlying: true,
                price: None,
            })
        },
        t if t == &swap::AddLiquidity::SIGNATURE_HASH.0 => {
            let event = decode::<swap::AddLiquidity>(log_data)?;
            Some(EventKind::AddLiquidity {
                provider: event.provider,
                token_amounts: event.tokenAmounts,
                fees: event.fees,
                invariant: Some(event.invariant),
                lp_token_supply: Some(event.lpTokenSupply),
                price: None,
            })
        },
        t if t == &swap::RemoveLiquidity::SIGNATURE_HASH.0 => {
            let event = decode::<swap::RemoveLiquidity>(log_data)?;
            Some(EventKind::RemoveLiquidity {
                provider: event.provider,
                token_amounts: event.tokenAmounts,
                lp_token_supply: Some(event.lpTokenSupply),
                price: None,
            })
        },
        t if t == &swap::RemoveLiquidityOne::SIGNATURE_HASH.0 => {
            let event = decode::<swap::RemoveLiquidityOne>(log_data)?;
            Some(EventKind::RemoveLiquidityOne {
                provider: event.provider,
                index: event.boughtId.saturating_to::<u64>(),
                amount: event.tokensBought,
                lp_token_supply: Some(event.lpTokenSupply),
                price: None,
            })
        },
        t if t == &swap::RemoveLiquidityImbalance::SIGNATURE_HASH.0 => {
            let event = decode::<swap::RemoveLiquidityImbalance>(log_data)?;
            Some(EventKind::RemoveLiquidityImbalance {
                provider: event.provider,
                token_amounts: event.tokenAmounts,
                fees: event.fees,
                invariant: event.invariant,
                lp_token_supply: event.lpTokenSupply,
            })
        },
        t if t == &swap::NewAdminFee::SIGNATURE_HASH.0 => {
            let event = decode::<swap::NewAdminFee>(log_data)?;
            Some(EventKind::NewAdminFee {
                new_fee: event.newAdminFee,
            })
        },
        t if t == &swap::NewSwapFee::SIGNATURE_HASH.0 => {
            let event = decode::<swap::NewSwapFee>(log_data)?;
            Some(EventKind::NewSwapFee {
                new_fee: event.newSwapFee,
            })
        },
        t if t == &swap::NewWithdrawFee::SIGNATURE_HASH.0 => {
            let event = decode::<swap::NewWithdrawFee>(log_data)?;
            Some(EventKind::NewWithdrawFee {
                new_fee: event.newWithdrawFee,
            })
        },
        t if t == &swap::RampA::SIGNATURE_HASH.0 => {
            let event = decode::<swap::RampA>(log_data)?;
            Some(EventKind::RampA {
                old_a: event.oldA,
                new_a: event.newA,
                initial_time: event.initialTime,
                future_time: event.futureTime,
            })
        },
        t if t == &swap::StopRampA::SIGNATURE_HASH.0 => {
            let event = decode::<swap::StopRampA>(log_data)?;
            Some(EventKind::StopRampA {
                current_a: event.currentA,
                time: event.time,
            })
        },
        _ => None,
    }
}

fn decode_wrapper_event(log_data: &LogData) -> Option<EventKind> {
    let topic0 = log_data.topics().first()?;

    match topic0 {
        t if t == &xswap_deposit::TokenExchange::SIGNATURE_HASH.0 => {
            let event = decode::<xswap_deposit::TokenExchange>(log_data)?;
            Some(EventKind::TokenSwap {
                buyer: event.buyer,
                sold_id: event.soldId.saturating_to::<u64>(),
                tokens_sold: event.tokensSold,
                bought_id: event.boughtId.saturating_to::<u64>(),
                tokens_bought: event.tokensBought,
                underlying: false,
                price: Some(event.price),
            })
        },
        t if t == &xswap_deposit::AddLiquidity::SIGNATURE_HASH.0 => {
            let event = decode::<xswap_deposit::AddLiquidity>(log_data)?;
            Some(EventKind::AddLiquidity {
                provider: event.provider,
                token_amounts: event.tokenAmounts,
                fees: Vec::new(),
                invariant: None,
                lp_token_supply: None,
                price: Some(event.price),
            })
        },
        // Same topic as the native RemoveLiquidity, the last word is the price here
        t if t == &xswap_deposit::RemoveLiquidity::SIGNATURE_HASH.0 => {
            let event = decode::<xswap_deposit::RemoveLiquidity>(log_data)?;
            Some(EventKind::RemoveLiquidity {
                provider: event.provider,
                token_amounts: event.tokenAmounts,
                lp_token_supply: None,
                price: Some(event.price),
            })
        },
        t if t == &xswap_deposit::RemoveLiquidityOne::SIGNATURE_HASH.0 => {
            let event = decode::<xswap_deposit::RemoveLiquidityOne>(log_data)?;
            Some(EventKind::RemoveLiquidityOne {
                provider: event.provider,
                index: event.coinIndex.saturating_to::<u64>(),
                amount: event.coinAmount,
                lp_token_supply: None,
                price: Some(event.price),
            })
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use hypersync_client::simple_types::Log;

    fn buyer() -> Address {
        Address::with_last_byte(0xaa)
    }

    fn token_swap() -> LogData {
        swap::TokenSwap {
            buyer: buyer(),
            tokensSold: U256::from(100u64),
            tokensBought: U256::from(95u64),
            soldId: 0,
            boughtId: 1,
        }
        .encode_log_data()
    }

    #[test]
    fn test_decode_token_swap() {
        let kind = decode_event(PoolShape::Plain, &token_swap()).unwrap();
        assert_eq!(
            kind,
            EventKind::TokenSwap {
                buyer: buyer(),
                sold_id: 0,
                tokens_sold: U256::from(100u64),
                bought_id: 1,
                tokens_bought: U256::from(95u64),
                underlying: false,
                price: None,
            }
        );
    }

    #[test]
    fn test_underlying_swap_only_for_meta_pools() {
        let log = meta_swap::TokenSwapUnderlying {
            buyer: buyer(),
            tokensSold: U256::from(1u64),
            tokensBought: U256::from(1u64),
            soldId: 3,
            boughtId: 0,
        }
        .encode_log_data();

        assert!(decode_event(PoolShape::Plain, &log).is_none());
        match decode_event(PoolShape::MetaPool, &log) {
            Some(EventKind::TokenSwap {
                underlying, sold_id, ..
            }) => {
                assert!(underlying);
                assert_eq!(sold_id, 3);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrapper_events_carry_price() {
        let log = xswap_deposit::RemoveLiquidityOne {
            provider: buyer(),
            coinIndex: U256::from(2u64),
            coinAmount: U256::from(7u64),
            price: U256::from(150u64),
        }
        .encode_log_data();

        let kind = decode_event(PoolShape::DepositWrapper, &log).unwrap();
        assert_eq!(
            kind,
            EventKind::RemoveLiquidityOne {
                provider: buyer(),
                index: 2,
                amount: U256::from(7u64),
                lp_token_supply: None,
                price: Some(U256::from(150u64)),
            }
        );
        // Wrapper ABI is not applied to native pools
        assert!(decode_event(PoolShape::Plain, &log).is_none());
    }

    #[test]
    fn test_wrapper_ignores_native_swap_events() {
        assert!(decode_event(PoolShape::DepositWrapper, &token_swap()).is_none());
    }

    #[test]
    fn test_parameter_event() {
        let log = swap::StopRampA {
            currentA: U256::from(300u64),
            time: U256::from(1_700_000_000u64),
        }
        .encode_log_data();

        assert_eq!(
            decode_event(PoolShape::MetaPool, &log),
            Some(EventKind::StopRampA {
                current_a: U256::from(300u64),
                time: U256::from(1_700_000_000u64),
            })
        );
    }

    #[test]
    fn test_shared_remove_liquidity_topic_decodes_by_shape() {
        let log = swap::RemoveLiquidity {
            provider: buyer(),
            tokenAmounts: vec![U256::from(1u64), U256::from(2u64)],
            lpTokenSupply: U256::from(42u64),
        }
        .encode_log_data();

        match decode_event(PoolShape::Plain, &log) {
            Some(EventKind::RemoveLiquidity {
                lp_token_supply,
                price,
                ..
            }) => {
                assert_eq!(lp_token_supply, Some(U256::from(42u64)));
                assert_eq!(price, None);
            },
            other => panic!("unexpected {:?}", other),
        }
        match decode_event(PoolShape::DepositWrapper, &log) {
            Some(EventKind::RemoveLiquidity {
                lp_token_supply,
                price,
                ..
            }) => {
                assert_eq!(lp_token_supply, None);
                assert_eq!(price, Some(U256::from(42u64)));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subscribed_topics_are_distinct() {
        let mut topics = subscribed_topics();
        let count = topics.len();
        topics.sort();
        topics.dedup();
        assert_eq!(topics.len(), count);
    }

    fn raw_log(emitter: Address, block: u64, log_index: u64, log_data: &LogData) -> Log {
        let mut log = Log {
            address: Some(emitter.0 .0.into()),
            block_number: Some(block.into()),
            log_index: Some(log_index.into()),
            transaction_hash: Some([0x11; 32].into()),
            data: Some(log_data.data.to_vec().into()),
            ..Default::default()
        };
        for topic in log_data.topics() {
            log.topics.push(Some(topic.0.into()));
        }
        log
    }

    fn emitters() -> Emitters {
        let mut pools = FxHashMap::default();
        pools.insert(Address::with_last_byte(0x10), PoolShape::Plain);
        Emitters {
            pools,
            voting_escrow: Some(Address::with_last_byte(0x50)),
        }
    }

    fn lock_deposit() -> LogData {
        voting_escrow::Deposit {
            provider: buyer(),
            value: U256::from(500u64),
            locktime: U256::from(1_700_604_800u64),
            depositType: 1,
            ts: U256::from(1_700_000_000u64),
        }
        .encode_log_data()
    }

    #[test]
    fn test_parse_logs_routes_by_emitter() {
        let pool = Address::with_last_byte(0x10);
        let escrow = Address::with_last_byte(0x50);
        let stranger = Address::with_last_byte(0x77);
        let timestamps = FxHashMap::from_iter([(100u64, 1_700_000_000u64)]);

        let logs = vec![
            raw_log(pool, 100, 0, &token_swap()),
            raw_log(stranger, 100, 1, &token_swap()),
            raw_log(escrow, 100, 2, &lock_deposit()),
            // Swap topic from the escrow is not an escrow event
            raw_log(escrow, 100, 3, &token_swap()),
        ];

        let messages = parse_logs(logs.into_iter(), &timestamps, &emitters());

        assert_eq!(messages.len(), 2);
        match &messages[0] {
            IndexMessage::Event(event) => {
                assert_eq!(event.pool, pool);
                assert_eq!(event.ctx.block_timestamp, 1_700_000_000);
                assert_eq!(event.ctx.tx_hash, format!("0x{}", "11".repeat(32)));
            },
            other => panic!("unexpected {:?}", other),
        }
        match &messages[1] {
            IndexMessage::Lock(deposit) => {
                assert_eq!(deposit.escrow, escrow);
                assert_eq!(deposit.provider, buyer());
                assert_eq!(deposit.value, U256::from(500u64));
                assert_eq!(deposit.locktime, U256::from(1_700_604_800u64));
                assert_eq!(deposit.ts, U256::from(1_700_000_000u64));
                assert_eq!(deposit.ctx.log_index, 2);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_log_without_block_timestamp_is_dropped() {
        let pool = Address::with_last_byte(0x10);
        let timestamps = FxHashMap::from_iter([(100u64, 1_700_000_000u64)]);

        let logs = vec![
            raw_log(pool, 101, 0, &token_swap()),
            raw_log(pool, 100, 4, &token_swap()),
        ];

        let messages = parse_logs(logs.into_iter(), &timestamps, &emitters());

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            IndexMessage::Event(event) => assert_eq!(event.ctx.block_number, 100),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_emitter_addresses_include_escrow() {
        let addresses = emitters().addresses();

        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&Address::with_last_byte(0x10)));
        assert!(addresses.contains(&Address::with_last_byte(0x50)));
    }
}
