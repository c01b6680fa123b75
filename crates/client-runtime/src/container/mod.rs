//! # Component Container
//!
//! Builds the shared infrastructure exactly once and hands it out by `Arc`:
//! one [`ReceiverRegistry`], one [`ShutdownCoordinator`] and one
//! [`MessageChannel`]. Nothing here is a process-wide global; components
//! receive what they need from the container.

pub mod config;

pub use config::RuntimeConfig;

use parking_lot::Mutex;
use std::sync::Arc;
use tc_01_shutdown_coordinator::{ReceiverRegistry, ShutdownCoordinator, StagePlan};
use tc_02_message_channel::MessageChannel;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Shared infrastructure for every component of the client.
pub struct ClientContainer {
    pub config: RuntimeConfig,
    pub registry: Arc<ReceiverRegistry>,
    pub coordinator: Arc<ShutdownCoordinator>,
    pub channel: Arc<MessageChannel>,
}

impl ClientContainer {
    /// Build the container with the default stage plan.
    ///
    /// The returned receiver resolves once the coordinator's completion
    /// hook has fired.
    pub fn new(config: RuntimeConfig) -> (Self, oneshot::Receiver<()>) {
        Self::with_plan(config, StagePlan::default())
    }

    pub fn with_plan(config: RuntimeConfig, plan: StagePlan) -> (Self, oneshot::Receiver<()>) {
        info!("Initializing shared infrastructure");

        let registry = Arc::new(ReceiverRegistry::new());
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Mutex::new(Some(done_tx));
        let on_complete = Arc::new(move || {
            if let Some(tx) = done_tx.lock().take() {
                // The receiver is gone only if nobody waits for shutdown.
                let _ = tx.send(());
            }
            debug!("Completion hook fired");
        });

        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&registry),
            plan,
            config.coordinator.clone(),
            on_complete,
        ));
        let channel = Arc::new(MessageChannel::new(config.channel.clone()));

        (
            Self {
                config,
                registry,
                coordinator,
                channel,
            },
            done_rx,
        )
    }
}
