//! TOML configuration for the receiver.
//!
//! Read from `--config <path>` or, by default, `receiver.toml` in the
//! platform config directory:
//! - Linux:    `~/.config/midilink/receiver.toml`
//! - macOS:    `~/Library/Application Support/MidiLink/receiver.toml`
//! - Windows:  `%APPDATA%\MidiLink\receiver.toml`
//!
//! Every field has a default, so a missing file or a partial one is fine:
//!
//! ```toml
//! log_level = "info"
//!
//! [identity]
//! peer = "studio"
//!
//! [namespace]
//! project = "jam"
//!
//! [session]
//! prewarm_amount = 5
//! max_inactive_time = 5
//! sweep_period_ms = 1000
//! max_channels = 16
//! pull_lifetime_ms = 3600000
//!
//! [access]
//! allowed = []
//! prohibited = ["mallory"]
//!
//! [network]
//! bind = "0.0.0.0:6363"
//! routes = [{ prefix = "/topo-prefix/alice", addr = "192.168.1.20:6363" }]
//! ```

use std::path::Path;
use std::time::Duration;

use midilink_core::config::{
    default_log_level, load_toml, ConfigError, NamespaceConfig, NetworkConfig,
};
use midilink_core::protocol::limits::{
    CHANNEL_LIMIT, MAX_CHANNELS, MAX_INACTIVE_TIME, PREWARM_AMOUNT, PULL_LIFETIME, SWEEP_PERIOD,
};
use midilink_core::RemoteId;
use serde::{Deserialize, Serialize};

use crate::application::access::AccessControl;
use crate::application::state::SessionSettings;

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub namespace: NamespaceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub access: AccessControl,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Who this receiver is on the substrate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfig {
    /// The `<peer>` component senders address heartbeats to.
    #[serde(default = "default_peer")]
    pub peer: String,
}

/// Session tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_prewarm_amount")]
    pub prewarm_amount: u64,
    /// Sweep ticks a silent session survives.
    #[serde(default = "default_max_inactive_time")]
    pub max_inactive_time: u32,
    #[serde(default = "default_sweep_period_ms")]
    pub sweep_period_ms: u64,
    /// At most 16: the channel is stamped into a 4-bit field.
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    #[serde(default = "default_pull_lifetime_ms")]
    pub pull_lifetime_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_peer() -> String {
    "playback".to_string()
}
fn default_prewarm_amount() -> u64 {
    PREWARM_AMOUNT
}
fn default_max_inactive_time() -> u32 {
    MAX_INACTIVE_TIME
}
fn default_sweep_period_ms() -> u64 {
    SWEEP_PERIOD.as_millis() as u64
}
fn default_max_channels() -> usize {
    MAX_CHANNELS
}
fn default_pull_lifetime_ms() -> u64 {
    PULL_LIFETIME.as_millis() as u64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            identity: IdentityConfig::default(),
            namespace: NamespaceConfig::default(),
            session: SessionConfig::default(),
            access: AccessControl::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            peer: default_peer(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prewarm_amount: default_prewarm_amount(),
            max_inactive_time: default_max_inactive_time(),
            sweep_period_ms: default_sweep_period_ms(),
            max_channels: default_max_channels(),
            pull_lifetime_ms: default_pull_lifetime_ms(),
        }
    }
}

// ── Loading and validation ────────────────────────────────────────────────────

impl AppConfig {
    /// Loads and validates the config at `path`; a missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable or malformed files and for
    /// values that fail [`AppConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_component("identity.peer", &self.identity.peer)?;
        validate_component("namespace.root", &self.namespace.root)?;
        validate_component("namespace.application", &self.namespace.application)?;
        validate_component("namespace.project", &self.namespace.project)?;
        let s = &self.session;
        if s.max_channels == 0 || s.max_channels > CHANNEL_LIMIT {
            return Err(ConfigError::Invalid {
                field: "session.max_channels",
                reason: format!("must be between 1 and {CHANNEL_LIMIT}, got {}", s.max_channels),
            });
        }
        if s.prewarm_amount == 0 {
            return Err(ConfigError::Invalid {
                field: "session.prewarm_amount",
                reason: "must be at least 1".into(),
            });
        }
        if s.sweep_period_ms == 0 || s.pull_lifetime_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session",
                reason: "periods and lifetimes must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub fn identity(&self) -> RemoteId {
        RemoteId::new(self.identity.peer.clone())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            prewarm_amount: self.session.prewarm_amount,
            max_inactive_time: self.session.max_inactive_time,
            max_channels: self.session.max_channels,
        }
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_millis(self.session.sweep_period_ms)
    }

    pub fn pull_lifetime(&self) -> Duration {
        Duration::from_millis(self.session.pull_lifetime_ms)
    }
}

/// A name component must be non-empty and free of `/`.
pub(crate) fn validate_component(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value:?} is not a valid name component"),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
