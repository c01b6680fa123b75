//! # TC-02 Message Channel
//!
//! Length-prefixed binary messaging over stream sockets (Unix-domain or TCP),
//! with fire-and-forget sends and blocking request/reply correlated by
//! sequence number.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌──────────────┬────────┬────────┬────────┬────────┬─────────────────┐
//! │ sync (8)     │ type 4 │ flags 4│ seq 4  │ len 4  │ payload (len)   │
//! │ "TCMSGv01"   │ i32 LE │ u32 LE │ u32 LE │ u32 LE │ ≤ 64 KiB        │
//! └──────────────┴────────┴────────┴────────┴────────┴─────────────────┘
//! flags bit 0 = reply required
//! ```
//!
//! ## Layers
//!
//! - [`transport`]: timed connect, timed read/write loops, liveness probe
//! - [`wire`]: encode/decode of the frame above
//! - [`channel`]: send, request/reply, reply, receive
//! - [`listener`]: accept loop serving inbound connections

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod errors;
pub mod listener;
pub mod message;
pub mod transport;
pub mod wire;

pub use channel::{ChannelConfig, MessageChannel};
pub use errors::{ChannelError, FramingError, ProtocolError, Result, TransportError};
pub use listener::{MessageHandler, MessageListener};
pub use message::{Message, MessageType, Payload, SequenceCounter};
pub use transport::{Connection, Direction, Endpoint, DEFAULT_SOCKET_PATH};
pub use wire::{HEADER_LEN, MAX_MESSAGE_LENGTH, SYNC_MARKER};
