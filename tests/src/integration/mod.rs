//! # Integration Scenarios
//!
//! Exercise the shutdown coordinator and the message channel together, the
//! way the client runtime wires them.

pub mod messaging_flow;
pub mod shutdown_flow;
