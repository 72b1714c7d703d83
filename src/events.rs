//! Typed events handed from the log streamer to the processor.

use alloy::primitives::{Address, U256};

use crate::db::models::PoolShape;

/// Position of an event in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventContext {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_hash: String,
    pub log_index: u32,
}

/// A decoded event emitted by a configured pool.
#[derive(Debug, Clone)]
pub struct ChainEvent {
    pub pool: Address,
    pub shape: PoolShape,
    pub ctx: EventContext,
    pub kind: EventKind,
}

/// A `Deposit` into the voting escrow.
///
/// `locktime` is the unlock time the deposit leaves the lock with and `ts`
/// the block time the escrow recorded; both are seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockDeposit {
    pub escrow: Address,
    pub ctx: EventContext,
    pub provider: Address,
    pub value: U256,
    pub locktime: U256,
    pub ts: U256,
}

/// Event payloads, normalized across pool shapes.
///
/// `price` is the reference token spot price carried by deposit-wrapper
/// events; native pool events never carry one. Fields a shape's event does
/// not report are `None` / empty.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    TokenSwap {
        buyer: Address,
        sold_id: u64,
        tokens_sold: U256,
        bought_id: u64,
        tokens_bought: U256,
        /// Indices refer to `all_tokens` rather than `tokens`.
        underlying: bool,
        price: Option<U256>,
    },
    AddLiquidity {
        provider: Address,
        token_amounts: Vec<U256>,
        fees: Vec<U256>,
        invariant: Option<U256>,
        lp_token_supply: Option<U256>,
        price: Option<U256>,
    },
    RemoveLiquidity {
        provider: Address,
        token_amounts: Vec<U256>,
        lp_token_supply: Option<U256>,
        price: Option<U256>,
    },
    RemoveLiquidityOne {
        provider: Address,
        index: u64,
        amount: U256,
        lp_token_supply: Option<U256>,
        price: Option<U256>,
    },
    RemoveLiquidityImbalance {
        provider: Address,
        token_amounts: Vec<U256>,
        fees: Vec<U256>,
        invariant: U256,
        lp_token_supply: U256,
    },
    NewAdminFee {
        new_fee: U256,
    },
    NewSwapFee {
        new_fee: U256,
    },
    NewWithdrawFee {
        new_fee: U256,
    },
    RampA {
        old_a: U256,
        new_a: U256,
        initial_time: U256,
        future_time: U256,
    },
    StopRampA {
        current_a: U256,
        time: U256,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TokenSwap { underlying: false, .. } => "TokenSwap",
            EventKind::TokenSwap { underlying: true, .. } => "TokenSwapUnderlying",
            EventKind::AddLiquidity { .. } => "AddLiquidity",
            EventKind::RemoveLiquidity { .. } => "RemoveLiquidity",
            EventKind::RemoveLiquidityOne { .. } => "RemoveLiquidityOne",
            EventKind::RemoveLiquidityImbalance { .. } => "RemoveLiquidityImbalance",
            EventKind::NewAdminFee { .. } => "NewAdminFee",
            EventKind::NewSwapFee { .. } => "NewSwapFee",
            EventKind::NewWithdrawFee { .. } => "NewWithdrawFee",
            EventKind::RampA { .. } => "RampA",
            EventKind::StopRampA { .. } => "StopRampA",
        }
    }
}
