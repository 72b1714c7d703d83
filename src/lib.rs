pub mod abis;
pub mod chain;
pub mod config;
pub mod db;
pub mod engine;
pub mod events;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod testing;

pub use chain::{ChainReader, RpcReader};
pub use config::Settings;
pub use db::{MemoryStore, PostgresClient, Store};
pub use engine::{Indexer, Pricing};
pub use worker::{ChainWorker, IndexMessage, Processor};
