//! Application layer for the receiver.
//!
//! Everything here is plain state plus the transitions the network layer
//! applies to it.  Nothing in this layer performs I/O: operations return what
//! should happen next (replies to send, pull requests to express, sessions
//! that went away) and the infrastructure layer carries it out.
//!
//! # Modules
//!
//! - **`control_blocks`** – Per-remote session records.
//! - **`channels`** – The fixed pool of playback channels.
//! - **`access`** – Allow and deny lists.
//! - **`state`** – [`state::ReceiverState`], the single owner of the three
//!   tables above.  The remaining modules add operations to it.
//! - **`connection_monitor`** – Heartbeat/handshake handling.
//! - **`pull_window`** – Prewarm and window sliding on responses.
//! - **`eviction`** – The inactivity sweep.
//! - **`operator`** – Operator console commands.

pub mod access;
pub mod channels;
pub mod connection_monitor;
pub mod control_blocks;
pub mod eviction;
pub mod operator;
pub mod pull_window;
pub mod state;
