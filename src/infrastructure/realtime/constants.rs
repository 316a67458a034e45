use std::time::Duration;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(60);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

pub const EVENT_CHANNEL_CAPACITY: usize = 256;
