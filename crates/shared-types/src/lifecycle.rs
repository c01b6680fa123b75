//! # Shutdown Lifecycle
//!
//! Defines the contract every component implements to take part in staged
//! shutdown, and the bookkeeping state the registry keeps for it.
//!
//! ## Status Machine
//!
//! ```text
//! Subscribed ──notify──→ Notified ──mark_ready──→ ShutdownCompleted
//!      │                     │
//!      └────unregister───────┴──────────────────→ Unsubscribed
//! ```
//!
//! `ShutdownCompleted` and `Unsubscribed` are terminal: no further
//! notification happens from either.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::NotifyShutdown;
//!
//! struct Uploader { stop: AtomicBool }
//!
//! impl NotifyShutdown for Uploader {
//!     fn notify_shutdown(&self) {
//!         self.stop.store(true, Ordering::SeqCst);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bookkeeping status of a registered shutdown receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiverStatus {
    /// Registered and waiting for its stage.
    Subscribed,
    /// Told to shut down; waiting for the component to report completion.
    Notified,
    /// The component reported that it finished shutting down.
    ShutdownCompleted,
    /// The component withdrew from orchestration.
    Unsubscribed,
}

impl ReceiverStatus {
    /// Whether no further notification can happen from this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ShutdownCompleted | Self::Unsubscribed)
    }
}

impl fmt::Display for ReceiverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribed => write!(f, "Subscribed"),
            Self::Notified => write!(f, "Notified"),
            Self::ShutdownCompleted => write!(f, "ShutdownCompleted"),
            Self::Unsubscribed => write!(f, "Unsubscribed"),
        }
    }
}

/// Capability every registered component exposes.
///
/// The coordinator invokes it when the component's stage comes up. It is
/// called outside the registry lock, so implementations may report
/// completion synchronously from inside the call. Implementations must be
/// idempotent.
pub trait NotifyShutdown: Send + Sync {
    /// Begin shutting down.
    fn notify_shutdown(&self);
}

impl<F> NotifyShutdown for F
where
    F: Fn() + Send + Sync,
{
    fn notify_shutdown(&self) {
        self()
    }
}

/// Hook invoked exactly once, after every component has finished.
pub trait CompleteShutdown: Send + Sync {
    /// The process may finish exiting.
    fn complete_shutdown(&self);
}

impl<F> CompleteShutdown for F
where
    F: Fn() + Send + Sync,
{
    fn complete_shutdown(&self) {
        self()
    }
}
