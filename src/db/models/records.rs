//! Per-event audit records.
//!
//! One record per decoded pool event, keyed by `<prefix>-<tx hash>-<log index>`
//! so a redelivered event lands on the same row.

use serde::{Deserialize, Serialize};

use crate::{db::Entity, events::EventContext};

fn record_id(prefix: &str, ctx: &EventContext) -> String {
    format!("{}-{}-{}", prefix, ctx.tx_hash, ctx.log_index)
}

/// A trade against a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchange {
    pub id: String,
    pub pool: String,
    pub buyer: String,
    pub sold_id: u64,
    pub tokens_sold: String,
    pub bought_id: u64,
    pub tokens_bought: String,
    /// Indices refer to the flattened token set (meta-pool underlying swap).
    pub underlying: bool,
    pub block: u64,
    pub timestamp: u64,
    pub transaction: String,
}

impl TokenExchange {
    pub fn id_for(ctx: &EventContext) -> String {
        record_id("token_exchange", ctx)
    }
}

impl Entity for TokenExchange {
    const KIND: &'static str = "token_exchange";

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityAction {
    Add,
    Remove,
    RemoveOne,
    RemoveImbalance,
}

impl LiquidityAction {
    fn prefix(&self) -> &'static str {
        match self {
            LiquidityAction::Add => "add_liquidity",
            LiquidityAction::Remove => "remove_liquidity",
            LiquidityAction::RemoveOne => "remove_liquidity_one",
            LiquidityAction::RemoveImbalance => "remove_liquidity_imbalance",
        }
    }
}

/// A deposit or withdrawal of liquidity.
///
/// Fields the emitting contract does not report (wrapper events carry no fees,
/// invariant or supply) are stored empty / "0".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityEvent {
    pub id: String,
    pub pool: String,
    pub action: LiquidityAction,
    pub provider: String,
    pub token_amounts: Vec<String>,
    pub fees: Vec<String>,
    pub invariant: String,
    pub lp_token_supply: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction: String,
}

impl LiquidityEvent {
    pub fn id_for(action: LiquidityAction, ctx: &EventContext) -> String {
        record_id(action.prefix(), ctx)
    }
}

impl Entity for LiquidityEvent {
    const KIND: &'static str = "liquidity_event";

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolParameter {
    AdminFee,
    SwapFee,
    WithdrawFee,
    RampA,
    StopRampA,
}

impl PoolParameter {
    fn prefix(&self) -> &'static str {
        match self {
            PoolParameter::AdminFee => "new_admin_fee",
            PoolParameter::SwapFee => "new_swap_fee",
            PoolParameter::WithdrawFee => "new_withdraw_fee",
            PoolParameter::RampA => "ramp_A",
            PoolParameter::StopRampA => "stop_ramp_A",
        }
    }
}

/// A fee or amplification change.
///
/// For `RampA` the timing fields hold the ramp's start and end, for
/// `StopRampA` `initial_time` holds the stop time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub id: String,
    pub pool: String,
    pub parameter: PoolParameter,
    pub old_value: Option<String>,
    pub new_value: String,
    pub initial_time: Option<u64>,
    pub future_time: Option<u64>,
    pub block: u64,
    pub timestamp: u64,
    pub transaction: String,
}

impl ParameterChange {
    pub fn id_for(parameter: PoolParameter, ctx: &EventContext) -> String {
        record_id(parameter.prefix(), ctx)
    }
}

impl Entity for ParameterChange {
    const KIND: &'static str = "parameter_change";

    fn id(&self) -> String {
        self.id.clone()
    }
}
