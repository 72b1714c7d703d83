//! Voting escrow lock tracking.
//!
//! Records are only compared against the position of the last deposit they
//! absorbed, so a redelivered log leaves them untouched.

use alloy::primitives::U256;
use anyhow::{Context, Result};
use log::debug;

use crate::{
    chain::ChainReader,
    db::{
        models::{Lock, LockSystemInfo},
        Store,
    },
    engine::Indexer,
    events::LockDeposit,
    utils::{address_to_string, parse_u256},
};

impl<R: ChainReader, S: Store> Indexer<R, S> {
    /// Apply a voting escrow `Deposit`.
    ///
    /// A deposit that opens a lock window (non-zero `locktime` after `ts`)
    /// folds its duration into the running average. Every deposit adds its
    /// value to the provider's lock and moves the lock's end to `locktime`.
    pub async fn handle_lock_deposit(&mut self, deposit: &LockDeposit) -> Result<()> {
        let ctx = &deposit.ctx;
        debug!(
            "Deposit of {} by {} into {} at block {} (log {})",
            deposit.value, deposit.provider, deposit.escrow, ctx.block_number, ctx.log_index
        );

        if !deposit.locktime.is_zero() && deposit.locktime > deposit.ts {
            self.record_lock_duration(deposit).await?;
        }

        let id = address_to_string(deposit.provider);
        let mut lock = match self.store.load::<Lock>(&id).await? {
            Some(lock) if lock.has_applied(ctx) => {
                debug!("Deposit {}-{} already applied to lock {}", ctx.tx_hash, ctx.log_index, id);
                return Ok(());
            },
            Some(lock) => lock,
            None => Lock::new(id),
        };

        let amount = parse_u256(&lock.amount)
            .with_context(|| format!("Corrupt amount on lock {}", lock.address))?;
        lock.amount = amount.saturating_add(deposit.value).to_string();
        lock.end = deposit.locktime.to_string();
        lock.updated_at_block = ctx.block_number;
        lock.updated_at_log_index = ctx.log_index;

        self.store.upsert(&lock).await
    }

    /// `average = (count * average + (locktime - ts)) / (count + 1)`, in
    /// integer seconds.
    async fn record_lock_duration(&mut self, deposit: &LockDeposit) -> Result<()> {
        let mut info = match self.store.load::<LockSystemInfo>(LockSystemInfo::ID).await? {
            Some(info) if info.has_applied(&deposit.ctx) => return Ok(()),
            Some(info) => info,
            None => LockSystemInfo::default(),
        };

        let old_count = U256::from(info.lock_count);
        let old_average =
            parse_u256(&info.average_lock_time).context("Corrupt average lock time")?;
        let duration = deposit.locktime - deposit.ts;

        let total = old_count.saturating_mul(old_average).saturating_add(duration);
        let count = info.lock_count + 1;

        info.lock_count = count;
        info.average_lock_time = (total / U256::from(count)).to_string();
        info.touch(&deposit.ctx);

        self.store.upsert(&info).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{Entity, MemoryStore},
        engine::Pricing,
        events::EventContext,
        testing::{addr, ether, MockChain},
    };

    const WEEK: u64 = 7 * 86_400;

    fn indexer() -> Indexer<MockChain, MemoryStore> {
        Indexer::new(MockChain::new(), MemoryStore::new(), Pricing::default())
    }

    fn deposit(block: u64, provider: u8, value: u64, ts: u64, locktime: u64) -> LockDeposit {
        LockDeposit {
            escrow: addr(0x50),
            ctx: EventContext {
                block_number: block,
                block_timestamp: ts,
                tx_hash: format!("0x{:064x}", block),
                log_index: 3,
            },
            provider: addr(provider),
            value: ether(value),
            locktime: U256::from(locktime),
            ts: U256::from(ts),
        }
    }

    async fn lock_info(indexer: &mut Indexer<MockChain, MemoryStore>) -> Option<LockSystemInfo> {
        indexer.store.load(LockSystemInfo::ID).await.unwrap()
    }

    async fn lock(indexer: &mut Indexer<MockChain, MemoryStore>, provider: u8) -> Lock {
        let id = address_to_string(addr(provider));
        indexer.store.load(&id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_first_deposit_opens_lock() {
        let mut indexer = indexer();

        indexer
            .handle_lock_deposit(&deposit(10, 1, 100, 1_000, 1_000 + 4 * WEEK))
            .await
            .unwrap();

        let info = lock_info(&mut indexer).await.unwrap();
        assert_eq!(info.lock_count, 1);
        assert_eq!(info.average_lock_time, (4 * WEEK).to_string());
        assert_eq!(info.updated, 1_000);
        assert_eq!(info.updated_at_block, 10);

        let lock = lock(&mut indexer, 1).await;
        assert_eq!(lock.amount, ether(100).to_string());
        assert_eq!(lock.end, (1_000 + 4 * WEEK).to_string());
    }

    #[tokio::test]
    async fn test_running_average_truncates() {
        let mut indexer = indexer();

        indexer.handle_lock_deposit(&deposit(10, 1, 1, 0, 100)).await.unwrap();
        indexer.handle_lock_deposit(&deposit(11, 2, 1, 1_000, 1_051)).await.unwrap();

        let info = lock_info(&mut indexer).await.unwrap();
        assert_eq!(info.lock_count, 2);
        // (1 * 100 + 51) / 2
        assert_eq!(info.average_lock_time, "75");
        assert_eq!(indexer.store.count(Lock::KIND), 2);
    }

    #[tokio::test]
    async fn test_deposit_without_window_only_moves_lock() {
        let mut indexer = indexer();
        indexer
            .handle_lock_deposit(&deposit(10, 1, 100, 1_000, 1_000 + WEEK))
            .await
            .unwrap();

        // Top-up with no unlock time, then one whose unlock time is not after ts
        indexer.handle_lock_deposit(&deposit(11, 1, 50, 2_000, 0)).await.unwrap();
        indexer.handle_lock_deposit(&deposit(12, 1, 25, 3_000, 3_000)).await.unwrap();

        let info = lock_info(&mut indexer).await.unwrap();
        assert_eq!(info.lock_count, 1);
        assert_eq!(info.updated_at_block, 10);

        let lock = lock(&mut indexer, 1).await;
        assert_eq!(lock.amount, ether(175).to_string());
        assert_eq!(lock.end, "3000");
    }

    #[tokio::test]
    async fn test_deposit_without_window_leaves_no_system_record() {
        let mut indexer = indexer();

        indexer.handle_lock_deposit(&deposit(10, 1, 5, 1_000, 0)).await.unwrap();

        assert!(lock_info(&mut indexer).await.is_none());
        assert_eq!(lock(&mut indexer, 1).await.amount, ether(5).to_string());
    }

    #[tokio::test]
    async fn test_redelivered_deposit_is_ignored() {
        let mut indexer = indexer();
        let first = deposit(10, 1, 100, 1_000, 1_000 + WEEK);

        indexer.handle_lock_deposit(&first).await.unwrap();
        indexer.handle_lock_deposit(&first).await.unwrap();

        let info = lock_info(&mut indexer).await.unwrap();
        assert_eq!(info.lock_count, 1);
        assert_eq!(info.average_lock_time, WEEK.to_string());
        assert_eq!(lock(&mut indexer, 1).await.amount, ether(100).to_string());
    }
}
