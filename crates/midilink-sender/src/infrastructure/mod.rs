//! Infrastructure layer for the sender.
//!
//! - **`device`**    – Event sources: hex lines from a reader, scripted lists.
//! - **`network`**   – [`network::SenderNode`]: prefix registration, request
//!   dispatch, the drain loop and the heartbeat loop.
//! - **`storage`**   – TOML configuration.

pub mod device;
pub mod network;
pub mod storage;
