//! Time-bucketed trade volume and daily TVL snapshots.

use anyhow::Result;
use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::db::{
    models::{Daily, DailyTvl, DailyVolume, Hourly, VolumeBucket, VolumeWindow, Weekly},
    Store,
};

/// Add `volume` to the hourly, daily and weekly buckets containing
/// `timestamp`, creating them as needed. Accrual is commutative so events
/// may arrive out of order.
pub async fn accrue<S: Store>(
    store: &mut S,
    pool: &str,
    timestamp: u64,
    volume: &BigDecimal,
) -> Result<()> {
    accrue_window::<Hourly, S>(store, pool, timestamp, volume).await?;
    accrue_window::<Daily, S>(store, pool, timestamp, volume).await?;
    accrue_window::<Weekly, S>(store, pool, timestamp, volume).await?;
    Ok(())
}

async fn accrue_window<W: VolumeWindow, S: Store>(
    store: &mut S,
    pool: &str,
    timestamp: u64,
    volume: &BigDecimal,
) -> Result<()> {
    let id = VolumeBucket::<W>::id_for(pool, timestamp);
    let mut bucket = store
        .load::<VolumeBucket<W>>(&id)
        .await?
        .unwrap_or_else(|| VolumeBucket::new(pool, timestamp));

    bucket.volume += volume;
    store.upsert(&bucket).await
}

/// Volume of the day containing `timestamp`, zero when nothing traded.
/// Never creates a bucket.
pub async fn daily_volume<S: Store>(store: &mut S, pool: &str, timestamp: u64) -> Result<BigDecimal> {
    let id = DailyVolume::id_for(pool, timestamp);
    Ok(store
        .load::<DailyVolume>(&id)
        .await?
        .map(|bucket| bucket.volume)
        .unwrap_or_else(BigDecimal::zero))
}

/// Record `tvl` as the pool's TVL for the day containing `timestamp`,
/// replacing any earlier snapshot of that day.
pub async fn snapshot_daily_tvl<S: Store>(
    store: &mut S,
    pool: &str,
    timestamp: u64,
    tvl: &BigDecimal,
) -> Result<()> {
    let mut snapshot = DailyTvl::new(pool, timestamp);
    snapshot.tvl = tvl.clone();
    store.upsert(&snapshot).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        models::{HourlyVolume, WeeklyVolume},
        Entity, MemoryStore,
    };
    use std::str::FromStr;

    const POOL: &str = "0xpool";
    const HOUR: u64 = 3_600;
    const DAY: u64 = 86_400;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[tokio::test]
    async fn test_accrue_hits_every_window() {
        let mut store = MemoryStore::new();
        let ts = 10 * DAY + 5 * HOUR + 17;

        accrue(&mut store, POOL, ts, &dec("97.5")).await.unwrap();

        let hourly: HourlyVolume = store
            .load(&HourlyVolume::id_for(POOL, ts))
            .await
            .unwrap()
            .unwrap();
        let daily: DailyVolume = store.load(&DailyVolume::id_for(POOL, ts)).await.unwrap().unwrap();
        let weekly: WeeklyVolume = store
            .load(&WeeklyVolume::id_for(POOL, ts))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hourly.volume, dec("97.5"));
        assert_eq!(hourly.timestamp, 10 * DAY + 5 * HOUR);
        assert_eq!(daily.volume, dec("97.5"));
        assert_eq!(daily.timestamp, 10 * DAY);
        assert_eq!(weekly.volume, dec("97.5"));
        assert_eq!(weekly.timestamp, 7 * DAY);
    }

    #[tokio::test]
    async fn test_out_of_order_accrual_sums() {
        let mut store = MemoryStore::new();
        let day = 3 * DAY;

        // Later hour first, then an earlier hour of the same day
        accrue(&mut store, POOL, day + 2 * HOUR, &dec("10")).await.unwrap();
        accrue(&mut store, POOL, day + HOUR, &dec("5")).await.unwrap();
        accrue(&mut store, POOL, day + 2 * HOUR + 59, &dec("1.5")).await.unwrap();

        assert_eq!(daily_volume(&mut store, POOL, day).await.unwrap(), dec("16.5"));
        assert_eq!(store.count(HourlyVolume::KIND), 2);
        assert_eq!(store.count(DailyVolume::KIND), 1);
        let late: HourlyVolume = store
            .load(&HourlyVolume::id_for(POOL, day + 2 * HOUR))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(late.volume, dec("11.5"));
    }

    #[tokio::test]
    async fn test_daily_volume_does_not_create_bucket() {
        let mut store = MemoryStore::new();
        assert!(daily_volume(&mut store, POOL, DAY).await.unwrap().is_zero());
        assert_eq!(store.count(DailyVolume::KIND), 0);
    }

    #[tokio::test]
    async fn test_daily_tvl_is_overwritten() {
        let mut store = MemoryStore::new();

        snapshot_daily_tvl(&mut store, POOL, DAY + 10, &dec("100")).await.unwrap();
        snapshot_daily_tvl(&mut store, POOL, DAY + 20, &dec("250")).await.unwrap();

        let snapshot: DailyTvl = store.load(&DailyTvl::id_for(POOL, DAY)).await.unwrap().unwrap();
        assert_eq!(snapshot.tvl, dec("250"));
        assert_eq!(snapshot.timestamp, DAY);
        assert_eq!(store.count(DailyTvl::KIND), 1);
    }
}
