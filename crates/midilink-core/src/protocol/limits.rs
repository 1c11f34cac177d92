//! Protocol constants shared by both peers.
//!
//! These are the defaults the configuration layer falls back to.  Most of
//! them can be overridden from the TOML config; [`EVENT_SIZE`] and
//! [`CHANNEL_LIMIT`] are fixed by the MIDI wire format.

use std::time::Duration;

/// Size in bytes of one MIDI control event on the wire.
pub const EVENT_SIZE: usize = 3;

/// Period between two heartbeat probes sent by the sender.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// Consecutive unanswered heartbeat probes tolerated before the sender resets
/// its session.
pub const MAX_HEARTBEAT_PROBE: u32 = 3;

/// Pull requests issued back to back when a receiver session is established.
pub const PREWARM_AMOUNT: u64 = 5;

/// Pause between accepting a sender and expressing the prewarm pulls, so
/// the `ACCEPTED` reply reaches the sender before its first pull does.
pub const PREWARM_DELAY: Duration = Duration::from_millis(20);

/// Sweep ticks a receiver session may stay silent before it is evicted.
pub const MAX_INACTIVE_TIME: u32 = 5;

/// Period of one eviction sweep tick.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Default number of playback channels.
pub const MAX_CHANNELS: usize = 16;

/// Hard ceiling on channels: the channel number is stamped into the low
/// nibble of the MIDI status byte.
pub const CHANNEL_LIMIT: usize = 16;

/// Maximum number of events the sender packs into one response.
pub const MAX_BATCH: usize = 10;

/// Lifetime of a receiver pull request.  Pull requests wait for the sender
/// to have something to say, so they are long-lived.
pub const PULL_LIFETIME: Duration = Duration::from_secs(3600);

/// Pause before a nacked pull request is expressed again.
pub const PULL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Lifetime of a fire-and-forget shutdown request.
pub const SHUTDOWN_LIFETIME: Duration = Duration::from_secs(10);
