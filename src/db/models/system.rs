use serde::{Deserialize, Serialize};

use crate::{db::Entity, events::EventContext};

/// Process-wide counters.
///
/// Primary Key: "current" (single row)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub pool_count: u64,
    pub exchange_count: u64,
    pub updated: u64,
    pub updated_at_block: u64,
    pub updated_at_transaction: String,
}

impl SystemInfo {
    pub const ID: &'static str = "current";

    pub fn touch(&mut self, ctx: &EventContext) {
        self.updated = ctx.block_timestamp;
        self.updated_at_block = ctx.block_number;
        self.updated_at_transaction = ctx.tx_hash.clone();
    }
}

impl Entity for SystemInfo {
    const KIND: &'static str = "system";

    fn id(&self) -> String {
        Self::ID.to_string()
    }
}
