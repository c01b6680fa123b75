//! # Message Channel
//!
//! Sends framed messages over a [`Connection`], optionally blocking for a
//! reply correlated by sequence number, and answers inbound requests.
//!
//! One channel is built by the application root and shared by `Arc`. It owns
//! the sequence counter; sockets stay owned by whoever opened them.

use crate::errors::{ChannelError, FramingError, Result, TransportError};
use crate::message::{Message, Payload, SequenceCounter};
use crate::transport::{connect_timed, Connection, Endpoint, DEFAULT_SOCKET_PATH};
use crate::wire::{self, HEADER_LEN, MAX_MESSAGE_LENGTH};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Socket timeouts and the well-known local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
    /// Bound on each individual read or write.
    pub io_timeout: Duration,
    pub default_socket_path: PathBuf,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            default_socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

impl ChannelConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TC_CONNECT_TIMEOUT_MS`: connect timeout (default: 5000)
    /// - `TC_IO_TIMEOUT_MS`: per-call read/write timeout (default: 10000)
    /// - `TC_SOCKET_PATH`: well-known local socket path
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout: millis_from_env("TC_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),
            io_timeout: millis_from_env("TC_IO_TIMEOUT_MS").unwrap_or(defaults.io_timeout),
            default_socket_path: env::var("TC_SOCKET_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.default_socket_path),
        }
    }

    /// Replace `DefaultLocal` with the configured path.
    #[must_use]
    pub fn resolve(&self, endpoint: &Endpoint) -> Endpoint {
        match endpoint {
            Endpoint::DefaultLocal => Endpoint::Local(self.default_socket_path.clone()),
            other => other.clone(),
        }
    }
}

fn millis_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Framed point-to-point messaging.
#[derive(Debug, Default)]
pub struct MessageChannel {
    config: ChannelConfig,
    sequence: SequenceCounter,
}

impl MessageChannel {
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            sequence: SequenceCounter::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Open a connection bounded by the connect timeout.
    pub fn connect(&self, endpoint: &Endpoint) -> Result<Arc<Connection>> {
        let endpoint = self.config.resolve(endpoint);
        let connection = connect_timed(&endpoint, self.config.connect_timeout)?;
        Ok(Arc::new(connection))
    }

    /// New empty message with the next sequence number.
    pub fn create_message(&self, msg_type: i32, destination: Arc<Connection>) -> Result<Message> {
        let message = Message::new(msg_type, self.sequence.next())?;
        Ok(message.with_destination(destination))
    }

    /// Write `message` to its destination.
    ///
    /// With `wants_reply`, blocks for one reply frame and returns its payload
    /// only if the reply carries the same sequence number.
    pub fn send(&self, message: &mut Message, wants_reply: bool) -> Result<Option<Payload>> {
        let destination = Arc::clone(message.destination().ok_or(ChannelError::NoDestination)?);
        if !destination.is_connected() {
            return Err(TransportError::NotConnected.into());
        }

        message.set_reply_required(wants_reply);
        let frame = wire::encode(message);
        destination.write_timed(&frame, self.config.io_timeout)?;
        debug!(
            "[Channel] Sent type={} seq={} len={} to {}",
            message.msg_type(),
            message.sequence(),
            message.payload().len(),
            destination.peer()
        );

        if !wants_reply {
            return Ok(None);
        }

        let reply = self.read_frame(&destination)?;
        if reply.sequence() != message.sequence() {
            warn!(
                "[Channel] Discarding reply seq={} (expected {}) from {}",
                reply.sequence(),
                message.sequence(),
                destination.peer()
            );
            return Err(ChannelError::SequenceMismatch {
                expected: message.sequence(),
                actual: reply.sequence(),
            });
        }
        Ok(Some(reply.into_payload()))
    }

    /// Answer `original` with `payload`, reusing its type and sequence number.
    pub fn reply(&self, original: &Message, payload: &[u8]) -> Result<()> {
        if !original.reply_required() {
            return Err(ChannelError::ReplyNotRequested);
        }
        let destination = original.destination().ok_or(ChannelError::NoDestination)?;

        let mut reply = Message::new(original.msg_type().get(), original.sequence())?
            .with_destination(Arc::clone(destination));
        reply.set_payload(payload)?;
        self.send(&mut reply, false)?;
        Ok(())
    }

    /// Block for one inbound frame on `connection`.
    pub fn receive(&self, connection: &Arc<Connection>) -> Result<Message> {
        let message = self.read_frame(connection)?;
        debug!(
            "[Channel] Received type={} seq={} len={} from {}",
            message.msg_type(),
            message.sequence(),
            message.payload().len(),
            connection.peer()
        );
        Ok(message.with_destination(Arc::clone(connection)))
    }

    fn read_frame(&self, connection: &Connection) -> Result<Message> {
        let timeout = self.config.io_timeout;

        let mut frame = vec![0u8; HEADER_LEN];
        connection.read_timed(&mut frame, timeout)?;

        let length = wire::peek_length(&frame)?;
        if length > MAX_MESSAGE_LENGTH {
            return Err(FramingError::LengthTooLarge {
                length,
                max: MAX_MESSAGE_LENGTH,
            }
            .into());
        }

        frame.resize(HEADER_LEN + length, 0);
        connection.read_timed(&mut frame[HEADER_LEN..], timeout)?;
        Ok(wire::decode(&frame)?)
    }
}
