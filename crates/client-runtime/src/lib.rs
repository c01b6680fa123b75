//! # Client Runtime Library
//!
//! This library exposes the internal modules of the client runtime for
//! testing. The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - shared infrastructure and configuration
//! - `bridge` - inbound messaging endpoint, first to shut down
//! - `runtime` - startup and shutdown sequencing

pub mod bridge;
pub mod container;
pub mod runtime;

pub use bridge::{BridgeHandler, ExternalReceiveBridge, SHUTDOWN_REQUEST, STATUS_QUERY};
pub use container::{ClientContainer, RuntimeConfig};
pub use runtime::ClientRuntime;
