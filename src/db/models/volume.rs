use std::marker::PhantomData;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::db::Entity;

/// A fixed-length time window used to bucket trade volume.
pub trait VolumeWindow: std::fmt::Debug + Clone + Send + Sync + 'static {
    /// Store namespace for buckets of this window.
    const KIND: &'static str;
    /// Id infix, `<pool>-<label>-<start>`.
    const LABEL: &'static str;
    /// Window length in seconds.
    const LENGTH: u64;

    /// Start of the window containing `timestamp`.
    fn bucket_start(timestamp: u64) -> u64 {
        timestamp - timestamp % Self::LENGTH
    }
}

#[derive(Debug, Clone)]
pub struct Hourly;

#[derive(Debug, Clone)]
pub struct Daily;

#[derive(Debug, Clone)]
pub struct Weekly;

impl VolumeWindow for Hourly {
    const KIND: &'static str = "hourly_volume";
    const LABEL: &'static str = "hour";
    const LENGTH: u64 = 60 * 60;
}

impl VolumeWindow for Daily {
    const KIND: &'static str = "daily_volume";
    const LABEL: &'static str = "day";
    const LENGTH: u64 = 60 * 60 * 24;
}

impl VolumeWindow for Weekly {
    const KIND: &'static str = "weekly_volume";
    const LABEL: &'static str = "week";
    const LENGTH: u64 = 60 * 60 * 24 * 7;
}

/// Trade volume accrued by one pool within one window.
///
/// Primary Key: `<pool>-<label>-<bucket start>`
/// Only exists for windows that saw at least one trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VolumeBucket<W: VolumeWindow> {
    pub pool: String,
    pub timestamp: u64,
    pub volume: BigDecimal,
    #[serde(skip)]
    window: PhantomData<W>,
}

pub type HourlyVolume = VolumeBucket<Hourly>;
pub type DailyVolume = VolumeBucket<Daily>;
pub type WeeklyVolume = VolumeBucket<Weekly>;

impl<W: VolumeWindow> VolumeBucket<W> {
    /// Empty bucket for the window containing `timestamp`.
    pub fn new(pool: &str, timestamp: u64) -> Self {
        Self {
            pool: pool.to_string(),
            timestamp: W::bucket_start(timestamp),
            volume: BigDecimal::from(0),
            window: PhantomData,
        }
    }

    /// Store id of the bucket containing `timestamp`.
    pub fn id_for(pool: &str, timestamp: u64) -> String {
        format!("{}-{}-{}", pool, W::LABEL, W::bucket_start(timestamp))
    }
}

impl<W: VolumeWindow> Entity for VolumeBucket<W> {
    const KIND: &'static str = W::KIND;

    fn id(&self) -> String {
        Self::id_for(&self.pool, self.timestamp)
    }
}

/// TVL of one pool as of the last liquidity-affecting event of a day.
///
/// Primary Key: `<pool>-day-<day start>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTvl {
    pub pool: String,
    pub timestamp: u64,
    pub tvl: BigDecimal,
}

impl DailyTvl {
    pub fn new(pool: &str, timestamp: u64) -> Self {
        Self {
            pool: pool.to_string(),
            timestamp: Daily::bucket_start(timestamp),
            tvl: BigDecimal::from(0),
        }
    }

    pub fn id_for(pool: &str, timestamp: u64) -> String {
        format!("{}-day-{}", pool, Daily::bucket_start(timestamp))
    }
}

impl Entity for DailyTvl {
    const KIND: &'static str = "daily_tvl";

    fn id(&self) -> String {
        Self::id_for(&self.pool, self.timestamp)
    }
}
