//! # Runtime Configuration
//!
//! Aggregates the configuration of every subsystem plus the address the
//! external receive bridge listens on. Everything is read from the
//! environment; there is no configuration file.

use client_telemetry::TelemetryConfig;
use std::env;
use tc_01_shutdown_coordinator::CoordinatorConfig;
use tc_02_message_channel::{ChannelConfig, Endpoint};

/// Complete client configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
    /// Shutdown coordinator timing.
    pub coordinator: CoordinatorConfig,
    /// Socket timeouts and the well-known local path.
    pub channel: ChannelConfig,
    /// Where the external receive bridge accepts connections.
    pub listen: Endpoint,
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TC_LISTEN_ADDR`: socket path or `host:port` (default: the
    ///   well-known local path)
    /// - plus everything read by [`TelemetryConfig::from_env`],
    ///   [`CoordinatorConfig::from_env`] and [`ChannelConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            telemetry: TelemetryConfig::from_env(),
            coordinator: CoordinatorConfig::from_env(),
            channel: ChannelConfig::from_env(),
            listen: env::var("TC_LISTEN_ADDR")
                .ok()
                .and_then(|addr| addr.parse().ok())
                .unwrap_or_default(),
        }
    }
}
