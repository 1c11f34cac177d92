//! Control events, event batches, and handshake reply content.
//!
//! A response to a pull request carries zero or more 3-byte MIDI events
//! concatenated back to back:
//!
//! ```text
//! [status][data1][data2][status][data1][data2] ...
//! ```
//!
//! The all-zero event `[0, 0, 0]` is reserved as the shutdown sentinel: it is
//! never played back and tells the receiver to tear the session down.

use std::fmt;

use thiserror::Error;

use super::limits::EVENT_SIZE;

/// Errors produced while unpacking payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload length is not a whole number of events.
    #[error("payload length {0} is not a multiple of {EVENT_SIZE}")]
    Misaligned(usize),

    /// Handshake reply content was not recognised.
    #[error("unrecognised handshake reply: {0:?}")]
    UnknownReply(String),
}

// ── ControlEvent ──────────────────────────────────────────────────────────────

/// One raw 3-byte MIDI control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlEvent(pub [u8; EVENT_SIZE]);

impl ControlEvent {
    /// The reserved teardown event.
    pub const SHUTDOWN: ControlEvent = ControlEvent([0, 0, 0]);

    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self([status, data1, data2])
    }

    pub fn bytes(&self) -> [u8; EVENT_SIZE] {
        self.0
    }

    pub fn is_shutdown(&self) -> bool {
        *self == Self::SHUTDOWN
    }

    /// Stamps a playback channel into the status byte.
    ///
    /// The message kind (high nibble) is kept; the low nibble is replaced by
    /// `channel`, which must be below 16.
    pub fn on_channel(self, channel: u8) -> Self {
        debug_assert!(channel < 16, "channel must fit in a nibble");
        let [status, d1, d2] = self.0;
        Self([(status & 0xF0) | (channel & 0x0F), d1, d2])
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "[{a:02x} {b:02x} {c:02x}]")
    }
}

/// Concatenates events into one response payload.
pub fn encode_batch(events: &[ControlEvent]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(events.len() * EVENT_SIZE);
    for event in events {
        buf.extend_from_slice(&event.0);
    }
    buf
}

/// Splits a response payload into events, preserving order.
///
/// An empty payload is a valid empty batch.
///
/// # Errors
///
/// Returns [`PayloadError::Misaligned`] when `bytes.len()` is not a multiple
/// of [`EVENT_SIZE`]; nothing is returned in that case.
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<ControlEvent>, PayloadError> {
    if bytes.len() % EVENT_SIZE != 0 {
        return Err(PayloadError::Misaligned(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(EVENT_SIZE)
        .map(|c| ControlEvent([c[0], c[1], c[2]]))
        .collect())
}

// ── Handshake reply ───────────────────────────────────────────────────────────

/// Why a receiver refused a heartbeat/handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Every playback channel is taken.
    Capacity,
    /// The allow list or the deny list excludes the sender.
    Access,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Capacity => write!(f, "no free channel"),
            DenyReason::Access => write!(f, "access denied"),
        }
    }
}

/// Content of the response to a heartbeat-tagged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReply {
    Accepted,
    Denied(DenyReason),
}

const ACCEPTED: &str = "ACCEPTED";
const DENIED_CAPACITY: &str = "DENIED:capacity";
const DENIED_ACCESS: &str = "DENIED:access";

impl HandshakeReply {
    pub fn to_bytes(self) -> Vec<u8> {
        let text = match self {
            HandshakeReply::Accepted => ACCEPTED,
            HandshakeReply::Denied(DenyReason::Capacity) => DENIED_CAPACITY,
            HandshakeReply::Denied(DenyReason::Access) => DENIED_ACCESS,
        };
        text.as_bytes().to_vec()
    }

    /// # Errors
    ///
    /// Returns [`PayloadError::UnknownReply`] for any other content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        match bytes {
            b"ACCEPTED" => Ok(HandshakeReply::Accepted),
            b"DENIED:capacity" => Ok(HandshakeReply::Denied(DenyReason::Capacity)),
            b"DENIED:access" => Ok(HandshakeReply::Denied(DenyReason::Access)),
            other => Err(PayloadError::UnknownReply(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_batch_preserves_order() {
        // Arrange
        let bytes = [0x90, 60, 100, 0x80, 60, 0, 0xB0, 7, 90];

        // Act
        let events = decode_batch(&bytes).unwrap();

        // Assert
        assert_eq!(
            events,
            vec![
                ControlEvent::new(0x90, 60, 100),
                ControlEvent::new(0x80, 60, 0),
                ControlEvent::new(0xB0, 7, 90),
            ]
        );
    }

    #[test]
    fn test_decode_batch_accepts_empty_payload() {
        assert_eq!(decode_batch(&[]), Ok(Vec::new()));
    }

    #[test]
    fn test_decode_batch_rejects_misaligned_payload() {
        assert_eq!(
            decode_batch(&[0x90, 60, 100, 0x80]),
            Err(PayloadError::Misaligned(4))
        );
    }

    #[test]
    fn test_encode_batch_concatenates_events() {
        let events = [ControlEvent::new(1, 2, 3), ControlEvent::new(4, 5, 6)];
        assert_eq!(encode_batch(&events), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_shutdown_sentinel_is_all_zero() {
        assert!(ControlEvent::new(0, 0, 0).is_shutdown());
        assert!(!ControlEvent::new(0x90, 0, 0).is_shutdown());
    }

    #[test]
    fn test_on_channel_replaces_low_nibble_only() {
        let note_on = ControlEvent::new(0x93, 60, 100);
        assert_eq!(note_on.on_channel(5), ControlEvent::new(0x95, 60, 100));
        assert_eq!(note_on.on_channel(15).bytes()[0], 0x9F);
    }

    #[test]
    fn test_handshake_reply_round_trip() {
        for reply in [
            HandshakeReply::Accepted,
            HandshakeReply::Denied(DenyReason::Capacity),
            HandshakeReply::Denied(DenyReason::Access),
        ] {
            assert_eq!(HandshakeReply::from_bytes(&reply.to_bytes()), Ok(reply));
        }
    }

    #[test]
    fn test_handshake_reply_rejects_unknown_content() {
        assert!(matches!(
            HandshakeReply::from_bytes(b"MAYBE"),
            Err(PayloadError::UnknownReply(_))
        ));
    }

    #[test]
    fn test_control_event_display_is_hex() {
        assert_eq!(ControlEvent::new(0x90, 0x3c, 0x64).to_string(), "[90 3c 64]");
    }
}
