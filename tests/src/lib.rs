//! # Telematics Client Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Codec and coordinator benchmarks (criterion)
//! └── src/integration/  # Cross-crate scenarios
//!     ├── shutdown_flow.rs   # Full telematics topology, staged shutdown
//!     └── messaging_flow.rs  # Concurrent request/reply through a listener
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p tc-tests
//!
//! # Benchmarks
//! cargo bench -p tc-tests
//! ```

pub mod integration;
