//! # Messages
//!
//! A [`Message`] exclusively owns its payload bytes and optionally carries
//! the connection it is addressed to (or arrived on).

use crate::errors::ProtocolError;
use crate::transport::Connection;
use crate::wire::MAX_MESSAGE_LENGTH;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Protocol discriminator. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(i32);

impl MessageType {
    pub fn new(value: i32) -> Result<Self, ProtocolError> {
        if value <= 0 {
            return Err(ProtocolError::InvalidType(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned, bounded payload buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Copy `bytes` into a payload. Lengths at or above
    /// [`MAX_MESSAGE_LENGTH`] are rejected.
    pub fn new(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() >= MAX_MESSAGE_LENGTH {
            return Err(ProtocolError::PayloadTooLarge {
                length: bytes.len(),
                max: MAX_MESSAGE_LENGTH,
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Adopt bytes already bounded by the frame decoder.
    pub(crate) fn from_wire(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Monotonic sequence numbers for outgoing messages. Zero is never issued.
#[derive(Debug)]
pub struct SequenceCounter {
    next: Mutex<u32>,
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self {
            next: Mutex::new(1),
        }
    }
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next sequence number.
    pub fn next(&self) -> u32 {
        let mut next = self.next.lock();
        let sequence = *next;
        *next = next.checked_add(1).unwrap_or(1);
        sequence
    }
}

/// One protocol message.
#[derive(Debug, Clone)]
pub struct Message {
    msg_type: MessageType,
    sequence: u32,
    reply_required: bool,
    payload: Payload,
    destination: Option<Arc<Connection>>,
}

impl Message {
    /// Create an empty message. Fails for non-positive types.
    pub fn new(msg_type: i32, sequence: u32) -> Result<Self, ProtocolError> {
        Ok(Self::from_parts(
            MessageType::new(msg_type)?,
            sequence,
            false,
            Payload::default(),
        ))
    }

    pub(crate) fn from_parts(
        msg_type: MessageType,
        sequence: u32,
        reply_required: bool,
        payload: Payload,
    ) -> Self {
        Self {
            msg_type,
            sequence,
            reply_required,
            payload,
            destination: None,
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: Arc<Connection>) -> Self {
        self.destination = Some(destination);
        self
    }

    #[must_use]
    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn reply_required(&self) -> bool {
        self.reply_required
    }

    pub fn set_reply_required(&mut self, reply_required: bool) {
        self.reply_required = reply_required;
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Replace the payload. On rejection the message is left unchanged.
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.payload = Payload::new(bytes)?;
        Ok(())
    }

    #[must_use]
    pub fn destination(&self) -> Option<&Arc<Connection>> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Arc<Connection>) {
        self.destination = Some(destination);
    }
}

/// Equality covers what travels on the wire; the destination is ignored.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.msg_type == other.msg_type
            && self.sequence == other.sequence
            && self.reply_required == other.reply_required
            && self.payload == other.payload
    }
}

impl Eq for Message {}
