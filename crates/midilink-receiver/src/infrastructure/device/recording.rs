//! In-memory sink for tests.
//!
//! Every emitted event is pushed into a `Mutex<Vec<...>>` so that assertions
//! can inspect exactly what was played and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let sink = Arc::new(RecordingSink::new());
//! node = ReceiverNode::new(..., Arc::clone(&sink) as Arc<dyn ControlEventSink>, ...);
//! // ... drive a session ...
//! assert_eq!(sink.events()[0], ControlEvent::new(0x90, 60, 100));
//! ```
//!
//! Set `should_fail = true` to make every call fail, which exercises the
//! error paths of callers.

use std::sync::Mutex;

use midilink_core::{ControlEvent, ControlEventSink, DeviceError};

#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Every successfully emitted event, oldest first.
    pub played: Mutex<Vec<ControlEvent>>,
    /// When `true`, `emit` returns [`DeviceError::Rejected`].
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything played so far.
    pub fn events(&self) -> Vec<ControlEvent> {
        self.played.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl ControlEventSink for RecordingSink {
    fn emit(&self, event: ControlEvent) -> Result<(), DeviceError> {
        if self.should_fail {
            return Err(DeviceError::Rejected {
                event,
                reason: "mock failure".into(),
            });
        }
        if let Ok(mut played) = self.played.lock() {
            played.push(event);
        }
        Ok(())
    }
}
