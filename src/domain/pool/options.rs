use std::time::Duration;

use crate::config::DatabaseConfig;

/// Sizing and lifecycle parameters for [`ConnectionPool`](super::ConnectionPool).
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Warm connections kept idle
    pub pool_size: usize,
    /// Extra connections allowed while the warm set is busy
    pub max_overflow: usize,
    /// Wait bound for a free slot
    pub acquire_timeout: Duration,
    /// Bound for opening one connection
    pub connect_timeout: Duration,
    /// Replace connections older than this; `None` disables
    pub recycle: Option<Duration>,
    /// Ping idle connections before handing them out
    pub pre_ping: bool,
}

impl PoolOptions {
    /// Maximum number of simultaneously checked-out connections.
    pub fn capacity(&self) -> usize {
        self.pool_size + self.max_overflow
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for PoolOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            pool_size: config.pool_size as usize,
            max_overflow: config.max_overflow as usize,
            acquire_timeout: config.pool_timeout(),
            connect_timeout: config.connect_timeout(),
            recycle: config.pool_recycle(),
            pre_ping: config.pool_pre_ping,
        }
    }
}
