//! Binary codec for the frames the UDP substrate exchanges.
//!
//! Wire format:
//! ```text
//! [version:1][reserved:3][payload_len:4][payload:N]
//! ```
//! Header size: 8 bytes; `payload_len` is big-endian.  The payload is the
//! bincode encoding of a [`Frame`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::name::Name;

/// Current frame format version.
pub const FRAME_VERSION: u8 = 1;

/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload accepted on decode; one UDP datagram.
pub const MAX_FRAME_PAYLOAD: usize = 65_507 - FRAME_HEADER_SIZE;

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The byte slice is shorter than the header.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The version byte is not one we speak.
    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    /// The declared payload length does not match what arrived.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// The frame is larger than one datagram.
    #[error("frame payload of {0} bytes exceeds the datagram limit")]
    TooLarge(usize),

    /// bincode could not (de)serialise the payload.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// One datagram on the UDP substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// A named request.  `nonce` lets the requester tell apart retransmitted
    /// copies of the same name.
    Request {
        nonce: Uuid,
        name: Name,
        lifetime_ms: u32,
    },
    /// The single answer to every pending request with this exact name.
    Response { name: Name, content: Vec<u8> },
    /// The responder has nothing registered for the name.
    Nack {
        nonce: Uuid,
        name: Name,
        reason: String,
    },
}

/// Encodes `frame` into a datagram.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] if the encoded payload does not fit in a
/// datagram, or [`CodecError::MalformedPayload`] if serialisation fails.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, CodecError> {
    let payload =
        bincode::serialize(frame).map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(CodecError::TooLarge(payload.len()));
    }

    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.push(FRAME_VERSION);
    buf.extend_from_slice(&[0x00; 3]); // reserved
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes one datagram.
///
/// # Errors
///
/// Returns [`CodecError`] if the header or payload is malformed.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(CodecError::InsufficientData {
            needed: FRAME_HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != FRAME_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    // bytes[1..4] are reserved – ignored on decode

    let declared = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let available = bytes.len() - FRAME_HEADER_SIZE;
    if declared != available {
        return Err(CodecError::PayloadLengthMismatch {
            declared,
            available,
        });
    }

    bincode::deserialize(&bytes[FRAME_HEADER_SIZE..])
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_name() -> Name {
        "/topo-prefix/alice/midi-ndn/jam/4".parse().unwrap()
    }

    #[test]
    fn test_request_frame_survives_encode_decode() {
        // Arrange
        let frame = Frame::Request {
            nonce: Uuid::new_v4(),
            name: sample_name(),
            lifetime_ms: 4000,
        };

        // Act
        let bytes = encode_frame(&frame).unwrap();
        let decoded = decode_frame(&bytes).unwrap();

        // Assert
        assert_eq!(bytes[0], FRAME_VERSION);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_response_frame_carries_content_verbatim() {
        let frame = Frame::Response {
            name: sample_name(),
            content: vec![0x90, 60, 100],
        };
        let decoded = decode_frame(&encode_frame(&frame).unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(
            decode_frame(&[1, 0, 0]),
            Err(CodecError::InsufficientData {
                needed: FRAME_HEADER_SIZE,
                available: 3
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = encode_frame(&Frame::Response {
            name: sample_name(),
            content: Vec::new(),
        })
        .unwrap();
        bytes[0] = 99;
        assert_eq!(decode_frame(&bytes), Err(CodecError::UnsupportedVersion(99)));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let mut bytes = encode_frame(&Frame::Response {
            name: sample_name(),
            content: vec![1, 2, 3],
        })
        .unwrap();
        bytes.pop();
        assert!(matches!(
            decode_frame(&bytes),
            Err(CodecError::PayloadLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_payload() {
        let bytes = [FRAME_VERSION, 0, 0, 0, 0, 0, 0, 2, 0xFF, 0xFF];
        assert!(matches!(
            decode_frame(&bytes),
            Err(CodecError::MalformedPayload(_))
        ));
    }
}
