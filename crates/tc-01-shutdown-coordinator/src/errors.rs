//! # Coordinator Errors

use shared_types::{ComponentRole, Identity};
use thiserror::Error;

/// Non-fatal registry failures. Public registry operations report these as
/// a `false` return and a log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Registration attempted without a receiver.
    #[error("No shutdown receiver supplied for {0}")]
    MissingCapability(Identity),

    /// Identity is not in the registry.
    #[error("Receiver {0} is not registered")]
    NotFound(Identity),
}

/// Errors raised while building or starting the coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// `start()` was called more than once.
    #[error("Shutdown coordinator already started")]
    AlreadyStarted,

    /// The background thread could not be spawned.
    #[error("Failed to spawn coordinator thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// A role appears in more than one stage.
    #[error("Invalid stage plan: {role} appears in stages {first} and {second}")]
    InvalidPlan {
        role: ComponentRole,
        first: usize,
        second: usize,
    },
}
