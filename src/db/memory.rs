use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::db::{Entity, Store};

/// In-process store.
///
/// Records are kept as JSON values so that every load goes through the same
/// serde round trip as the PostgreSQL store. Used when no database is
/// configured and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: FxHashMap<(&'static str, String), serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored under `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.records.keys().filter(|(k, _)| *k == kind).count()
    }
}

impl Store for MemoryStore {
    async fn load<E: Entity>(&mut self, id: &str) -> Result<Option<E>> {
        match self.records.get(&(E::KIND, id.to_string())) {
            Some(value) => {
                let entity = serde_json::from_value(value.clone())
                    .with_context(|| format!("Failed to decode {} {}", E::KIND, id))?;
                Ok(Some(entity))
            },
            None => Ok(None),
        }
    }

    async fn upsert<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let value = serde_json::to_value(entity)
            .with_context(|| format!("Failed to encode {} {}", E::KIND, entity.id()))?;
        self.records.insert((E::KIND, entity.id()), value);
        Ok(())
    }
}
