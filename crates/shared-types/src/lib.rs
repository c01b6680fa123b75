//! # Shared Types Crate
//!
//! Types shared by every on-board component of the telematics client.
//!
//! ## Design Principles
//!
//! - **One identity type**: well-known roles and ad-hoc named components are
//!   both tracked through [`Identity`], so there is a single lookup path.
//! - **Capabilities, not ownership**: components hand out `Arc<dyn NotifyShutdown>`;
//!   whoever holds the reference never tears the component down.
//! - **Explicit threads**: long-lived loops run on a [`ManagedThread`] that can be
//!   stopped, detached or joined by its owner.

pub mod identity;
pub mod lifecycle;
pub mod thread;

pub use identity::{ComponentRole, Identity, UNKNOWN_NAME};
pub use lifecycle::{CompleteShutdown, NotifyShutdown, ReceiverStatus};
pub use thread::{ManagedThread, ThreadContext};
