use std::future::Future;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresClient;

/// A record persisted by the indexer.
///
/// Records live in a flat key-value space: `KIND` names the collection and
/// `id()` is the stable key within it.
pub trait Entity: Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> String;
}

/// Load-by-key / upsert-by-key persistence.
///
/// Owned by the single event processor, so methods take `&mut self` and no
/// record is ever shared between tasks.
pub trait Store: Send {
    fn load<E: Entity>(&mut self, id: &str) -> impl Future<Output = Result<Option<E>>> + Send;

    fn upsert<E: Entity>(&mut self, entity: &E) -> impl Future<Output = Result<()>> + Send;
}
