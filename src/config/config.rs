use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::db::models::PoolShape;

/// PostgreSQL database connection configuration.
///
/// Optional: when absent the indexer keeps its state in memory, which is
/// only useful for dry runs since nothing survives a restart.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    4
}

/// Chain access configuration.
///
/// Logs are streamed from HyperSync, contract state is read over JSON-RPC.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    pub chain_id: u64,
    pub hypersync_url: String,
    pub hypersync_bearer_token: String,
    pub rpc_url: String,
    /// First block to stream when no checkpoint exists yet.
    #[serde(default)]
    pub start_block: u64,
    #[serde(default = "default_tip_poll_interval")]
    pub tip_poll_interval_milliseconds: u64,
    /// Capacity of the streamer -> processor channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_tip_poll_interval() -> u64 {
    1_000
}

fn default_channel_capacity() -> usize {
    1_024
}

/// Reference token price correction.
///
/// Deposit-wrapper events carry a spot price for one pegged token; balances
/// and trade legs in that token are multiplied by it.
#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    #[serde(default = "default_reference_token")]
    pub reference_token: String,
    /// The event price is divided by `10^price_decimals` before use.
    #[serde(default)]
    pub price_decimals: u32,
}

/// JPYC on Astar
fn default_reference_token() -> String {
    "0x431d5dff03120afa4bdf332c61a6e1766ef37bdb".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            reference_token: default_reference_token(),
            price_decimals: 0,
        }
    }
}

/// A pool contract to index.
#[derive(Debug, Deserialize, Clone)]
pub struct PoolSettings {
    pub address: String,
    pub shape: PoolShape,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub postgres: Option<PostgresSettings>,
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub pricing: PricingSettings,
    pub pools: Vec<PoolSettings>,
    /// Voting escrow whose `Deposit` events feed the lock records.
    #[serde(default)]
    pub voting_escrow: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
