mod config;

pub use self::config::{IndexerSettings, PoolSettings, PostgresSettings, PricingSettings, Settings};
