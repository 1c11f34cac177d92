//! Device collaborator traits.
//!
//! The physical MIDI device is outside MIDI-Link's concern.  The sender reads
//! events from a [`ControlEventSource`]; the receiver plays them back through
//! a [`ControlEventSink`].  Concrete adapters live in the application crates.

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::payload::ControlEvent;

/// Error type for device I/O.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("device rejected event {event}: {reason}")]
    Rejected { event: ControlEvent, reason: String },
}

/// Input side: yields raw control events captured from the device.
#[async_trait]
pub trait ControlEventSource: Send {
    /// Waits for the next event.  Returns `None` once the device is closed.
    async fn next_event(&mut self) -> Option<ControlEvent>;
}

/// Output side: plays one event, already stamped with its channel.
pub trait ControlEventSink: Send + Sync {
    fn emit(&self, event: ControlEvent) -> Result<(), DeviceError>;
}
