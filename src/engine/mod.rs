//! Event processing core.
//!
//! [`Indexer`] turns decoded pool events into entity updates: it lazily
//! materializes pools on first sight, refreshes balances from chain, keeps
//! TVL/APY current and accrues trade volume into time buckets. Voting escrow
//! deposits update per-provider locks and the average lock time. It is owned by
//! a single consumer task, so every method takes `&mut self`.

mod handlers;
mod locks;
pub mod metrics;
mod pools;
mod token_directory;
pub mod topology;
pub mod volume;

pub use metrics::Pricing;
pub use token_directory::TokenDirectory;
pub use topology::PoolTopology;

use crate::{chain::ChainReader, db::Store};

pub struct Indexer<R: ChainReader, S: Store> {
    reader: R,
    store: S,
    tokens: TokenDirectory,
    pricing: Pricing,
}

impl<R: ChainReader, S: Store> Indexer<R, S> {
    pub fn new(reader: R, store: S, pricing: Pricing) -> Self {
        Self {
            reader,
            store,
            tokens: TokenDirectory::new(),
            pricing,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
