//! # Client Telemetry
//!
//! Structured logging for the telematics client, built on `tracing` and
//! `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use client_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_tracing(&config)?;
//!
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `TC_JSON_LOGS` | `false` | Emit JSON lines instead of plain text |
//! | `TC_CONSOLE_OUTPUT` | `true` | Write log lines to stdout |
//! | `TC_SERVICE_NAME` | `telematics-client` | Service name in the startup line |

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed, or the subscriber could
    /// not be built.
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
