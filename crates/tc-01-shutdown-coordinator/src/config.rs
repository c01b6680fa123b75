//! Coordinator timing configuration from environment variables.

use std::env;
use std::time::Duration;

/// Timing of the coordinator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Delay before the first tick, so late components can still register.
    pub grace_period: Duration,
    /// Delay between ticks.
    pub tick_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TC_SHUTDOWN_GRACE_MS`: grace period (default: 5000)
    /// - `TC_SHUTDOWN_TICK_MS`: tick interval (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            grace_period: millis_from_env("TC_SHUTDOWN_GRACE_MS").unwrap_or(defaults.grace_period),
            tick_interval: millis_from_env("TC_SHUTDOWN_TICK_MS").unwrap_or(defaults.tick_interval),
        }
    }
}

fn millis_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
