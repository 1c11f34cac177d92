//! Playback sinks.
//!
//! A real MIDI output port is outside this crate.  Two sinks are provided:
//!
//! - [`TracingSink`] logs every event it is given; the binary uses it.
//! - [`RecordingSink`] records events in memory for tests.

mod recording;
mod tracing_sink;

pub use recording::RecordingSink;
pub use tracing_sink::TracingSink;
