//! # TC-01 Shutdown Coordinator
//!
//! Staged, barrier-based shutdown orchestration for the on-board client.
//!
//! ## How It Works
//!
//! ```text
//!  components ──register()──→ ┌──────────────────┐
//!             ──mark_ready()─→ │ ReceiverRegistry │
//!             ──unregister()─→ └────────┬─────────┘
//!                                       │ one lock, shared
//!                                       ▼
//!                            ┌─────────────────────┐   every tick:
//!                            │ ShutdownCoordinator │   1. notify Named receivers
//!                            │  (own thread)       │   2. notify current stage
//!                            └─────────┬───────────┘   3. check completion
//!                                      │ all terminal
//!                                      ▼
//!                              CompleteShutdown hook
//! ```
//!
//! A stage is a barrier: no member of stage *k+1* is notified while any
//! member of stages 1..*k* is still `Subscribed` or `Notified`. Named
//! components are never staged and are notified on the first tick.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod plan;
pub mod registry;

pub use config::CoordinatorConfig;
pub use coordinator::{ShutdownCoordinator, TickReport};
pub use errors::{CoordinatorError, RegistrationError};
pub use plan::StagePlan;
pub use registry::{ReceiverRegistry, ReceiverSnapshot};
