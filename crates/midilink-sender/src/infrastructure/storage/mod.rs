//! Persistent configuration for the sender.

pub mod config;
