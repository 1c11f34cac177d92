//! Persistent storage for the receiver.
//!
//! - **`config`** – Reads the receiver's `AppConfig` from a TOML file.

pub mod config;
