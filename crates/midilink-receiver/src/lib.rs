//! midilink-receiver library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the receiver do? (for beginners)
//!
//! The *receiver* is the playback peer.  It owns a MIDI output with a fixed
//! number of channels and lets several remote controllers (*senders*) play
//! through it at the same time, one channel each.
//!
//! Because the substrate is pull-based, the receiver drives everything:
//!
//! 1. A sender probes the receiver with a `heartbeat` request.  The receiver
//!    checks its access lists, allocates a channel and answers `ACCEPTED`
//!    (or `DENIED:*`).
//! 2. On a new session the receiver immediately expresses a handful of
//!    sequence-numbered pull requests towards the sender (the *prewarm*).
//! 3. Each answered pull request carries a batch of 3-byte events.  They are
//!    played back on the session's channel and the pull window slides
//!    forward, issuing exactly as many new pull requests as were consumed.
//! 4. A periodic sweep tears down sessions whose heartbeats stopped.

/// Application layer: session tables and the state machines that drive them.
pub mod application;

/// Infrastructure layer: substrate wiring, timers, devices, console, config.
pub mod infrastructure;
