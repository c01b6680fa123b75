//! # External Receive Bridge
//!
//! The client's inbound messaging endpoint. Other processes on the vehicle
//! connect to it to query shutdown progress or to request a shutdown.
//!
//! The bridge is a first-stage shutdown receiver: when notified it stops
//! its listener (joining every session) and then reports itself complete.

use client_telemetry::log_component;
use parking_lot::Mutex;
use shared_types::{ComponentRole, Identity, NotifyShutdown};
use std::sync::{Arc, Weak};
use tc_01_shutdown_coordinator::ReceiverRegistry;
use tc_02_message_channel::{
    Endpoint, Message, MessageChannel, MessageHandler, MessageListener, TransportError,
};
use tokio::sync::Notify;
use tracing::warn;

/// Request: reply with the registry snapshot as JSON.
pub const STATUS_QUERY: i32 = 1;

/// Request: begin the staged shutdown.
pub const SHUTDOWN_REQUEST: i32 = 2;

/// Answers bridge requests.
pub struct BridgeHandler {
    registry: Weak<ReceiverRegistry>,
    shutdown_requested: Arc<Notify>,
}

impl BridgeHandler {
    pub fn new(registry: &Arc<ReceiverRegistry>, shutdown_requested: Arc<Notify>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            shutdown_requested,
        }
    }

    fn status_json(&self) -> Vec<u8> {
        let snapshot = self
            .registry
            .upgrade()
            .map(|registry| registry.snapshot())
            .unwrap_or_default();
        serde_json::to_vec(&snapshot).unwrap_or_else(|e| {
            warn!("[Bridge] Failed to encode status: {}", e);
            b"[]".to_vec()
        })
    }
}

impl MessageHandler for BridgeHandler {
    fn on_message(&self, channel: &MessageChannel, message: Message) {
        let answer = match message.msg_type().get() {
            STATUS_QUERY => self.status_json(),
            SHUTDOWN_REQUEST => {
                log_component!(info, "bridge", "Shutdown requested", peer = %peer_of(&message));
                self.shutdown_requested.notify_one();
                Vec::new()
            }
            other => {
                log_component!(
                    warn,
                    "bridge",
                    "Ignoring unknown message type",
                    msg_type = other,
                    peer = %peer_of(&message)
                );
                return;
            }
        };

        if message.reply_required() {
            if let Err(e) = channel.reply(&message, &answer) {
                log_component!(
                    warn,
                    "bridge",
                    "Reply failed",
                    seq = message.sequence(),
                    error = %e
                );
            }
        }
    }
}

fn peer_of(message: &Message) -> &str {
    message.destination().map_or("unknown", |d| d.peer())
}

/// Listener wrapper registered as `ExternalReceiveBridge`.
pub struct ExternalReceiveBridge {
    listener: Mutex<Option<MessageListener>>,
    endpoint: Endpoint,
    registry: Weak<ReceiverRegistry>,
}

impl ExternalReceiveBridge {
    pub const IDENTITY: Identity = Identity::Fixed(ComponentRole::ExternalReceiveBridge);

    /// Bind the bridge listener on `endpoint`.
    pub fn bind(
        endpoint: &Endpoint,
        channel: Arc<MessageChannel>,
        registry: &Arc<ReceiverRegistry>,
        shutdown_requested: Arc<Notify>,
    ) -> Result<Self, TransportError> {
        let handler = Arc::new(BridgeHandler::new(registry, shutdown_requested));
        let listener = MessageListener::bind(endpoint, channel, handler)?;
        Ok(Self {
            endpoint: listener.local_endpoint().clone(),
            listener: Mutex::new(Some(listener)),
            registry: Arc::downgrade(registry),
        })
    }

    /// The bound address.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener.lock().is_some()
    }
}

impl NotifyShutdown for ExternalReceiveBridge {
    fn notify_shutdown(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.stop();
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.mark_ready(&Self::IDENTITY);
        }
    }
}
