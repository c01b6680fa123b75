//! # Client Runtime
//!
//! Startup and shutdown sequencing for the whole client.

use crate::bridge::ExternalReceiveBridge;
use crate::container::{ClientContainer, RuntimeConfig};
use anyhow::{anyhow, Context, Result};
use client_telemetry::log_component;
use parking_lot::Mutex;
use shared_types::{Identity, NotifyShutdown};
use std::sync::Arc;
use tc_02_message_channel::Endpoint;
use tokio::sync::{oneshot, Notify};
use tracing::{info, warn};

/// The running client.
pub struct ClientRuntime {
    container: ClientContainer,
    bridge: Mutex<Option<Arc<ExternalReceiveBridge>>>,
    shutdown_requested: Arc<Notify>,
    completion: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ClientRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let (container, completion) = ClientContainer::new(config);
        Self {
            container,
            bridge: Mutex::new(None),
            shutdown_requested: Arc::new(Notify::new()),
            completion: Mutex::new(Some(completion)),
        }
    }

    #[must_use]
    pub fn container(&self) -> &ClientContainer {
        &self.container
    }

    /// Bring up the external receive bridge and register it for shutdown.
    pub fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Telematics Client v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let mut slot = self.bridge.lock();
        if slot.is_some() {
            return Err(anyhow!("client runtime already started"));
        }

        let bridge = Arc::new(
            ExternalReceiveBridge::bind(
                &self.container.config.listen,
                Arc::clone(&self.container.channel),
                &self.container.registry,
                Arc::clone(&self.shutdown_requested),
            )
            .with_context(|| {
                format!(
                    "Failed to bind external receive bridge on {}",
                    self.container.config.listen
                )
            })?,
        );
        self.container.coordinator.register(
            ExternalReceiveBridge::IDENTITY,
            Some(Arc::clone(&bridge) as Arc<dyn NotifyShutdown>),
        );
        info!("External receive bridge on {}", bridge.endpoint());
        *slot = Some(bridge);
        Ok(())
    }

    /// Register an additional component with the coordinator.
    pub fn register_component(
        &self,
        identity: Identity,
        receiver: Arc<dyn NotifyShutdown>,
    ) -> bool {
        self.container.coordinator.register(identity, Some(receiver))
    }

    /// Address the bridge is bound to, once started.
    #[must_use]
    pub fn bridge_endpoint(&self) -> Option<Endpoint> {
        self.bridge.lock().as_ref().map(|b| b.endpoint().clone())
    }

    /// Ask the runtime to shut down, as if a shutdown request had arrived
    /// over the bridge.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.notify_one();
    }

    /// Wait for Ctrl+C or a shutdown request, whichever comes first.
    pub async fn wait_for_shutdown_request(&self) -> Result<()> {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Ctrl+C received");
            }
            () = self.shutdown_requested.notified() => {
                info!("Shutdown requested");
            }
        }
        Ok(())
    }

    /// Run the staged shutdown and wait for its completion hook.
    pub async fn shutdown(&self) -> Result<()> {
        let completion = self
            .completion
            .lock()
            .take()
            .ok_or_else(|| anyhow!("shutdown already in progress"))?;

        log_component!(
            info,
            "runtime",
            "Initiating staged shutdown",
            receivers = self.container.registry.len()
        );
        self.container
            .coordinator
            .start()
            .context("Failed to start shutdown coordinator")?;

        if completion.await.is_err() {
            warn!("Completion hook dropped without firing");
        }
        info!("Shutdown complete");
        Ok(())
    }
}
