//! Infrastructure layer for the receiver.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `midilink_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – [`network::ReceiverNode`]: registers the receiver's
//!   prefix, answers heartbeats, expresses pull requests and applies their
//!   responses to the shared state.
//! - **`sweeper`** – The periodic inactivity sweep.
//! - **`console`** – Line-based operator console.
//! - **`device`** – Playback sinks.
//! - **`storage`** – TOML configuration.

pub mod console;
pub mod device;
pub mod network;
pub mod storage;
pub mod sweeper;
