//! # Wire Codec
//!
//! Encodes and decodes the fixed 24-byte header plus payload. Integers are
//! little-endian. Decoding checks the sync marker before anything else and
//! never reads more payload than the header declares.

use crate::errors::FramingError;
use crate::message::{Message, MessageType, Payload};

/// Frame synchronisation marker.
pub const SYNC_MARKER: [u8; 8] = *b"TCMSGv01";

/// Header size: marker + type + flags + sequence + length.
pub const HEADER_LEN: usize = 24;

/// Upper bound on payload length.
pub const MAX_MESSAGE_LENGTH: usize = 64 * 1024;

/// Flags bit 0: the sender blocks for a correlated reply.
pub const FLAG_REPLY_REQUIRED: u32 = 1;

const TYPE_OFFSET: usize = 8;
const FLAGS_OFFSET: usize = 12;
const SEQUENCE_OFFSET: usize = 16;
const LENGTH_OFFSET: usize = 20;

/// Parsed fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub msg_type: i32,
    pub flags: u32,
    pub sequence: u32,
    pub length: u32,
}

impl FrameHeader {
    /// Parse the fixed header. Only the marker and the header size are
    /// checked here.
    pub fn parse(bytes: &[u8]) -> Result<Self, FramingError> {
        check_marker(bytes)?;
        if bytes.len() < HEADER_LEN {
            return Err(FramingError::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }

        Ok(Self {
            msg_type: i32::from_le_bytes(field(bytes, TYPE_OFFSET)),
            flags: u32::from_le_bytes(field(bytes, FLAGS_OFFSET)),
            sequence: u32::from_le_bytes(field(bytes, SEQUENCE_OFFSET)),
            length: u32::from_le_bytes(field(bytes, LENGTH_OFFSET)),
        })
    }
}

fn check_marker(bytes: &[u8]) -> Result<(), FramingError> {
    match bytes.get(..SYNC_MARKER.len()) {
        Some(marker) if marker == SYNC_MARKER => Ok(()),
        Some(_) => Err(FramingError::BadSyncMarker),
        None => Err(FramingError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        }),
    }
}

fn field(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[offset..offset + 4]);
    out
}

/// Encode `message` as one frame.
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let payload = message.payload().as_bytes();
    let flags = if message.reply_required() {
        FLAG_REPLY_REQUIRED
    } else {
        0
    };

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&SYNC_MARKER);
    frame.extend_from_slice(&message.msg_type().get().to_le_bytes());
    frame.extend_from_slice(&flags.to_le_bytes());
    frame.extend_from_slice(&message.sequence().to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Decode one frame from the front of `bytes`. Trailing bytes are ignored.
pub fn decode(bytes: &[u8]) -> Result<Message, FramingError> {
    let header = FrameHeader::parse(bytes)?;

    let msg_type =
        MessageType::new(header.msg_type).map_err(|_| FramingError::InvalidType(header.msg_type))?;

    let length = header.length as usize;
    if length > MAX_MESSAGE_LENGTH {
        return Err(FramingError::LengthTooLarge {
            length,
            max: MAX_MESSAGE_LENGTH,
        });
    }

    let end = HEADER_LEN + length;
    let payload = bytes.get(HEADER_LEN..end).ok_or(FramingError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;

    Ok(Message::from_parts(
        msg_type,
        header.sequence,
        header.flags & FLAG_REPLY_REQUIRED != 0,
        Payload::from_wire(payload.to_vec()),
    ))
}

/// Declared payload length of a received header.
pub fn peek_length(header: &[u8]) -> Result<usize, FramingError> {
    Ok(FrameHeader::parse(header)?.length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(msg_type: i32, sequence: u32, payload: &[u8], reply: bool) -> Message {
        let mut message = Message::new(msg_type, sequence).unwrap();
        message.set_payload(payload).unwrap();
        message.set_reply_required(reply);
        message
    }

    #[test]
    fn test_header_layout() {
        let frame = encode(&message(0x0102_0304, 7, b"abc", true));
        assert_eq!(frame.len(), HEADER_LEN + 3);
        assert_eq!(&frame[..8], b"TCMSGv01");
        assert_eq!(&frame[8..12], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&frame[12..16], &[1, 0, 0, 0]);
        assert_eq!(&frame[16..20], &[7, 0, 0, 0]);
        assert_eq!(&frame[20..24], &[3, 0, 0, 0]);
        assert_eq!(&frame[24..], b"abc");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn proptest_decode_inverts_encode(
            msg_type in 1..=i32::MAX,
            sequence in any::<u32>(),
            reply in any::<bool>(),
            payload in prop::collection::vec(any::<u8>(), 0..MAX_MESSAGE_LENGTH),
        ) {
            let original = message(msg_type, sequence, &payload, reply);
            let frame = encode(&original);
            prop_assert_eq!(frame.len(), HEADER_LEN + payload.len());
            prop_assert_eq!(peek_length(&frame[..HEADER_LEN]).unwrap(), payload.len());
            prop_assert_eq!(decode(&frame).unwrap(), original);
        }
    }

    #[test]
    fn test_round_trip_boundary_lengths() {
        for length in [0, 1, HEADER_LEN, MAX_MESSAGE_LENGTH - 1] {
            let payload = vec![0xA5u8; length];
            let original = message(i32::MAX, u32::MAX, &payload, length % 2 == 0);
            assert_eq!(decode(&encode(&original)).unwrap(), original);
        }
    }

    #[test]
    fn test_corrupt_marker_rejected() {
        let mut frame = encode(&message(1, 1, b"payload", false));
        frame[3] ^= 0xFF;
        assert_eq!(decode(&frame).unwrap_err(), FramingError::BadSyncMarker);
        assert_eq!(peek_length(&frame[..HEADER_LEN]).unwrap_err(), FramingError::BadSyncMarker);
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let frame = encode(&message(1, 1, b"0123456789", false));
        let err = decode(&frame[..frame.len() - 1]).unwrap_err();
        assert_eq!(
            err,
            FramingError::Truncated {
                needed: HEADER_LEN + 10,
                available: HEADER_LEN + 9
            }
        );
    }

    #[test]
    fn test_short_header_rejected() {
        let frame = encode(&message(1, 1, b"", false));
        assert!(matches!(decode(&frame[..4]), Err(FramingError::Truncated { .. })));
        assert!(matches!(decode(&frame[..12]), Err(FramingError::Truncated { .. })));
    }

    #[test]
    fn test_non_positive_type_on_wire_rejected() {
        let mut frame = encode(&message(5, 1, b"", false));
        frame[8..12].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(decode(&frame).unwrap_err(), FramingError::InvalidType(0));
    }

    #[test]
    fn test_oversized_declared_length_rejected() {
        let mut frame = encode(&message(5, 1, b"", false));
        frame[20..24].copy_from_slice(&((MAX_MESSAGE_LENGTH as u32) + 1).to_le_bytes());
        assert!(matches!(decode(&frame), Err(FramingError::LengthTooLarge { .. })));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let original = message(9, 42, b"xy", false);
        let mut frame = encode(&original);
        frame.extend_from_slice(b"next-frame");
        assert_eq!(decode(&frame).unwrap(), original);
    }
}
