//! # Channel Errors
//!
//! Transport, framing and protocol failures, plus the umbrella
//! [`ChannelError`] returned by `send`, `reply` and `receive`.

use crate::transport::Direction;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Socket-level failures. The channel never retries on these.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("Connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("{direction} timed out after {timeout:?}")]
    Timeout {
        direction: Direction,
        timeout: Duration,
    },

    #[error("Short {direction}: {transferred} of {expected} bytes")]
    ShortTransfer {
        direction: Direction,
        transferred: usize,
        expected: usize,
    },

    #[error("Destination is not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether the peer closed the connection before sending anything.
    #[must_use]
    pub fn is_peer_closed(&self) -> bool {
        matches!(
            self,
            Self::ShortTransfer {
                direction: Direction::Read,
                transferred: 0,
                ..
            }
        )
    }
}

/// Malformed bytes on the wire. No partial message is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("Invalid sync marker")]
    BadSyncMarker,

    #[error("Truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Declared payload length {length} exceeds maximum {max}")]
    LengthTooLarge { length: usize, max: usize },

    #[error("Invalid message type {0} on the wire")]
    InvalidType(i32),
}

/// Violations when building a message locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Message type must be positive, got {0}")]
    InvalidType(i32),

    #[error("Payload of {length} bytes reaches the {max} byte limit")]
    PayloadTooLarge { length: usize, max: usize },
}

/// Errors surfaced by [`MessageChannel`](crate::MessageChannel).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A reply arrived for a different request and was discarded.
    #[error("Reply sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u32, actual: u32 },

    #[error("Message has no destination")]
    NoDestination,

    #[error("Original message did not request a reply")]
    ReplyNotRequested,
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
