//! # Receiver Registry
//!
//! Maps every component [`Identity`] to its shutdown capability and its
//! [`ReceiverStatus`]. Well-known roles and named components share one map,
//! guarded by one registry-wide lock.
//!
//! Entries are never removed. A component that withdraws stays in the map as
//! `Unsubscribed`; one that finished stays as `ShutdownCompleted`.

use crate::errors::RegistrationError;
use parking_lot::Mutex;
use serde::Serialize;
use shared_types::{Identity, NotifyShutdown, ReceiverStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered component.
pub(crate) struct ReceiverEntry {
    pub(crate) receiver: Arc<dyn NotifyShutdown>,
    pub(crate) status: ReceiverStatus,
}

/// Read-only view of one registry entry, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverSnapshot {
    pub identity: Identity,
    pub name: String,
    pub status: ReceiverStatus,
}

/// Shared registry of shutdown receivers.
#[derive(Default)]
pub struct ReceiverRegistry {
    entries: Mutex<HashMap<Identity, ReceiverEntry>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `receiver` under `identity`.
    ///
    /// Returns false without touching the registry when no receiver is
    /// supplied. Registering an identity twice replaces the earlier entry.
    pub fn register(&self, identity: Identity, receiver: Option<Arc<dyn NotifyShutdown>>) -> bool {
        let Some(receiver) = receiver else {
            warn!("[Registry] {}", RegistrationError::MissingCapability(identity));
            return false;
        };

        let mut entries = self.entries.lock();
        if let Some(previous) = entries.get(&identity) {
            warn!(
                "[Registry] {} already registered ({}), replacing",
                identity, previous.status
            );
        }

        info!("[Registry] Registered {}", identity);
        entries.insert(
            identity,
            ReceiverEntry {
                receiver,
                status: ReceiverStatus::Subscribed,
            },
        );
        true
    }

    /// Withdraw `identity` from orchestration.
    ///
    /// Idempotent: an already `Unsubscribed` entry stays so and still
    /// returns true. A `ShutdownCompleted` entry keeps its terminal status.
    pub fn unregister(&self, identity: &Identity) -> bool {
        self.update(identity, |status| match status {
            ReceiverStatus::Subscribed | ReceiverStatus::Notified => ReceiverStatus::Unsubscribed,
            terminal => terminal,
        })
    }

    /// Record that `identity` finished shutting down.
    ///
    /// An `Unsubscribed` entry keeps its terminal status.
    pub fn mark_ready(&self, identity: &Identity) -> bool {
        self.update(identity, |status| match status {
            ReceiverStatus::Subscribed | ReceiverStatus::Notified => {
                ReceiverStatus::ShutdownCompleted
            }
            terminal => terminal,
        })
    }

    fn update(
        &self,
        identity: &Identity,
        next: impl FnOnce(ReceiverStatus) -> ReceiverStatus,
    ) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(identity) else {
            warn!("[Registry] {}", RegistrationError::NotFound(identity.clone()));
            return false;
        };

        let previous = entry.status;
        entry.status = next(previous);
        debug!("[Registry] {}: {} -> {}", identity, previous, entry.status);
        true
    }

    /// Name of an identity: the role name for `Fixed`, the stored name for `Named`.
    #[must_use]
    pub fn name_of(identity: &Identity) -> &str {
        identity.name()
    }

    /// Current status of `identity`, if registered.
    #[must_use]
    pub fn status(&self, identity: &Identity) -> Option<ReceiverStatus> {
        self.entries.lock().get(identity).map(|entry| entry.status)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Diagnostic dump of every entry. Fixed roles come first, in role order,
    /// followed by named components sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ReceiverSnapshot> {
        let entries = self.entries.lock();
        let mut snapshot: Vec<ReceiverSnapshot> = entries
            .iter()
            .map(|(identity, entry)| ReceiverSnapshot {
                identity: identity.clone(),
                name: Self::name_of(identity).to_string(),
                status: entry.status,
            })
            .collect();
        snapshot.sort_by(|a, b| a.identity.cmp(&b.identity));
        snapshot
    }

    /// Run `f` with the whole map locked.
    pub(crate) fn with_entries<R>(
        &self,
        f: impl FnOnce(&mut HashMap<Identity, ReceiverEntry>) -> R,
    ) -> R {
        f(&mut self.entries.lock())
    }
}
