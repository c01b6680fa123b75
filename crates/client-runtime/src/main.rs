//! # Telematics Client Runtime
//!
//! ## Lifecycle
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging
//! 3. Bind the external receive bridge and register it for shutdown
//! 4. Wait for Ctrl+C or a shutdown request over the bridge
//! 5. Run the staged shutdown until every component has finished

use anyhow::{Context, Result};
use client_runtime::{ClientRuntime, RuntimeConfig};
use client_telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    let _guard = init_tracing(&config.telemetry).context("Failed to initialize logging")?;

    let runtime = ClientRuntime::new(config);
    runtime.start()?;

    info!("Client is running. Press Ctrl+C to stop.");
    runtime.wait_for_shutdown_request().await?;

    runtime.shutdown().await?;
    Ok(())
}
