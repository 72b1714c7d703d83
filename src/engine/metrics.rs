//! Derived pool metrics: TVL, APY and trade volume.
//!
//! All values are in the pool's common denomination (stableswap pools hold
//! pegged assets), with the one exception of the configured reference token,
//! whose amounts are multiplied by the spot price carried on wrapper events.

use alloy::primitives::U256;
use anyhow::Result;
use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::{
    config::PricingSettings,
    db::models::Token,
    utils::{address_to_string, parse_address, u256_to_decimal, u256_to_scaled_decimal},
};

/// Fees are fractions over 10^10.
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;

const DAYS_PER_YEAR: u64 = 365;

/// Reference token price correction.
#[derive(Debug, Clone)]
pub struct Pricing {
    /// Lowercase address, comparable with token ids.
    reference_token: String,
    price_decimals: u32,
}

impl Pricing {
    pub fn new(settings: &PricingSettings) -> Result<Self> {
        // Normalizes case and rejects garbage at startup
        let address = parse_address(&settings.reference_token)?;

        Ok(Self {
            reference_token: address_to_string(address),
            price_decimals: settings.price_decimals,
        })
    }

    /// Convert a raw amount of `token` into common units, applying the
    /// reference price when `token` is the reference token and the event
    /// carried a price.
    pub fn value(&self, token: &Token, amount: U256, price: Option<U256>) -> BigDecimal {
        let value = u256_to_decimal(amount, token.decimals);
        match price {
            Some(price) if token.address == self.reference_token => {
                value * u256_to_scaled_decimal(price, self.price_decimals)
            },
            _ => value,
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            reference_token: PricingSettings::default().reference_token,
            price_decimals: 0,
        }
    }
}

/// Sum of balances in common units. Tokens and balances are paired by
/// position; surplus entries on either side are ignored.
pub fn compute_tvl(
    pricing: &Pricing,
    tokens: &[Token],
    balances: &[U256],
    price: Option<U256>,
) -> BigDecimal {
    tokens
        .iter()
        .zip(balances)
        .fold(BigDecimal::zero(), |tvl, (token, balance)| {
            tvl + pricing.value(token, *balance, price)
        })
}

/// Annualized fee yield from one day of volume: `volume * fee / TVL * 365`.
/// Zero for an empty pool.
pub fn compute_apy(daily_volume: &BigDecimal, swap_fee: &BigDecimal, tvl: &BigDecimal) -> BigDecimal {
    if tvl.is_zero() {
        return BigDecimal::zero();
    }
    let fee_rate = swap_fee / BigDecimal::from(FEE_DENOMINATOR);
    daily_volume * fee_rate / tvl * BigDecimal::from(DAYS_PER_YEAR)
}

/// Volume credited for one trade: the mean of both legs in common units.
pub fn trade_volume(
    pricing: &Pricing,
    sold: (&Token, U256),
    bought: (&Token, U256),
    price: Option<U256>,
) -> BigDecimal {
    let sold = pricing.value(sold.0, sold.1, price);
    let bought = pricing.value(bought.0, bought.1, price);
    (sold + bought) / BigDecimal::from(2)
}
