//! Control-event sources the sender can read from.
//!
//! Real MIDI hardware access is platform plumbing outside this crate; the
//! binary reads hex-encoded events from stdin, which a small bridge script
//! (or a human) can feed.  [`ScriptedSource`] replays a fixed list and is
//! used in tests.

mod hex_line;
mod scripted;

pub use hex_line::{parse_event_line, HexLineSource, LineError};
pub use scripted::ScriptedSource;
