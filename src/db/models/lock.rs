use serde::{Deserialize, Serialize};

use crate::{db::Entity, events::EventContext};

/// Voting escrow position of one provider.
///
/// Primary Key: provider address
/// `amount` accumulates every deposit; `end` is the unlock time of the latest
/// one. Both are raw base-10 integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub address: String,
    pub amount: String,
    pub end: String,
    pub updated_at_block: u64,
    pub updated_at_log_index: u32,
}

impl Lock {
    pub fn new(address: String) -> Self {
        Self {
            address: address.to_lowercase(),
            amount: "0".to_string(),
            end: "0".to_string(),
            updated_at_block: 0,
            updated_at_log_index: 0,
        }
    }

    /// Whether the deposit at `ctx` is already part of this record.
    pub fn has_applied(&self, ctx: &EventContext) -> bool {
        (ctx.block_number, ctx.log_index) <= (self.updated_at_block, self.updated_at_log_index)
    }
}

impl Entity for Lock {
    const KIND: &'static str = "lock";

    fn id(&self) -> String {
        self.address.clone()
    }
}

/// Running average lock duration over every deposit that set a lock window.
///
/// Primary Key: "current" (single row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSystemInfo {
    pub lock_count: u64,
    /// Seconds, truncated by integer division on every update.
    pub average_lock_time: String,
    pub updated: u64,
    pub updated_at_block: u64,
    pub updated_at_log_index: u32,
    pub updated_at_transaction: String,
}

impl LockSystemInfo {
    pub const ID: &'static str = "current";

    pub fn touch(&mut self, ctx: &EventContext) {
        self.updated = ctx.block_timestamp;
        self.updated_at_block = ctx.block_number;
        self.updated_at_log_index = ctx.log_index;
        self.updated_at_transaction = ctx.tx_hash.clone();
    }

    /// Whether the deposit at `ctx` is already part of the average.
    pub fn has_applied(&self, ctx: &EventContext) -> bool {
        (ctx.block_number, ctx.log_index) <= (self.updated_at_block, self.updated_at_log_index)
    }
}

impl Default for LockSystemInfo {
    fn default() -> Self {
        Self {
            lock_count: 0,
            average_lock_time: "0".to_string(),
            updated: 0,
            updated_at_block: 0,
            updated_at_log_index: 0,
            updated_at_transaction: String::new(),
        }
    }
}

impl Entity for LockSystemInfo {
    const KIND: &'static str = "lock_system";

    fn id(&self) -> String {
        Self::ID.to_string()
    }
}
