//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name reported at startup
    pub service_name: String,

    /// Log level filter directive (trace, debug, info, warn, error, or a
    /// full `EnvFilter` directive)
    pub log_level: String,

    /// Whether to write log lines to stdout
    pub console_output: bool,

    /// Whether to format log lines as JSON
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "telematics-client".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TC_SERVICE_NAME`: Service name (default: telematics-client)
    /// - `TC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `TC_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `TC_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("TC_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("TC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("TC_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),

            json_logs: lookup("TC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Same configuration with a different level; handy for tests and
    /// command-line overrides.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
