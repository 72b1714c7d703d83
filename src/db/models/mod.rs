mod checkpoint;
mod lock;
mod pool;
mod records;
mod system;
mod token;
mod volume;

pub use checkpoint::SyncCheckpoint;
pub use lock::{Lock, LockSystemInfo};
pub use pool::{Pool, PoolShape};
pub use records::{LiquidityAction, LiquidityEvent, ParameterChange, PoolParameter, TokenExchange};
pub use system::SystemInfo;
pub use token::Token;
pub use volume::{
    Daily, DailyTvl, DailyVolume, Hourly, HourlyVolume, VolumeBucket, VolumeWindow, Weekly,
    WeeklyVolume,
};
