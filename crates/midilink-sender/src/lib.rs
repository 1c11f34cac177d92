//! midilink-sender library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the sender do? (for beginners)
//!
//! The *sender* is the peer with the keyboard or controller attached.  It
//! never pushes anything: the substrate only delivers data that somebody
//! asked for.  So the sender
//!
//! 1. probes its receiver with a `heartbeat` request every few seconds and
//!    considers itself connected while `ACCEPTED` replies keep coming;
//! 2. queues every event the device produces;
//! 3. answers the receiver's sequence-numbered pull requests, oldest request
//!    first, with up to ten queued events each.
//!
//! If too many heartbeats go unanswered the sender drops back to
//! disconnected and throws both queues away; a later reconnect starts clean.

/// Application layer: the sender's session state machine and queues.
pub mod application;

/// Infrastructure layer: substrate wiring, timers, devices, config.
pub mod infrastructure;
