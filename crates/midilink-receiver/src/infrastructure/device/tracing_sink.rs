//! Sink that writes each played event to the log.

use midilink_core::{ControlEvent, ControlEventSink, DeviceError};
use tracing::info;

/// Logs every event at `info` level under the `playback` target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl ControlEventSink for TracingSink {
    fn emit(&self, event: ControlEvent) -> Result<(), DeviceError> {
        let [status, data1, data2] = event.bytes();
        info!(
            target: "playback",
            "channel {:>2}  kind {:x}  {:>3} {:>3}  {event}",
            status & 0x0F,
            status >> 4,
            data1,
            data2
        );
        Ok(())
    }
}
