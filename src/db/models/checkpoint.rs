use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Entity;

/// Indexer sync progress checkpoint.
///
/// Tracks the next block to stream for a chain. Used to resume indexing after
/// restarts; blocks after the checkpoint may be delivered again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub chain_id: u64,
    pub next_block: u64,
    pub updated_at: DateTime<Utc>,
}

impl SyncCheckpoint {
    pub fn new(chain_id: u64, next_block: u64) -> Self {
        Self {
            chain_id,
            next_block,
            updated_at: Utc::now(),
        }
    }
}

impl Entity for SyncCheckpoint {
    const KIND: &'static str = "checkpoint";

    fn id(&self) -> String {
        self.chain_id.to_string()
    }
}
