//! TOML configuration for the sender.
//!
//! Read from `--config <path>` or `sender.toml` in the platform config
//! directory (see `midilink_core::config::default_config_path`).  Every field
//! has a default:
//!
//! ```toml
//! log_level = "info"
//!
//! [identity]
//! device = "controller"   # our own <peer> component
//! remote = "playback"     # the receiver we serve
//!
//! [namespace]
//! project = "jam"
//!
//! [session]
//! heartbeat_period_ms = 5000
//! max_heartbeat_probe = 3
//! batch_cap = 10
//!
//! [network]
//! bind = "0.0.0.0:6363"
//! routes = [{ prefix = "/topo-prefix/playback", addr = "192.168.1.10:6363" }]
//! ```

use std::path::Path;
use std::time::Duration;

use midilink_core::config::{
    default_log_level, load_toml, ConfigError, NamespaceConfig, NetworkConfig,
};
use midilink_core::protocol::limits::{HEARTBEAT_PERIOD, MAX_BATCH, MAX_HEARTBEAT_PROBE};
use midilink_core::RemoteId;
use serde::{Deserialize, Serialize};

use crate::application::session::SenderSettings;

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub namespace: NamespaceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Our `<peer>` component; the receiver pulls from under it.
    #[serde(default = "default_device")]
    pub device: String,
    /// The receiver's `<peer>` component.
    #[serde(default = "default_remote")]
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_heartbeat_period_ms")]
    pub heartbeat_period_ms: u64,
    #[serde(default = "default_max_heartbeat_probe")]
    pub max_heartbeat_probe: u32,
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device() -> String {
    "controller".to_string()
}
fn default_remote() -> String {
    "playback".to_string()
}
fn default_heartbeat_period_ms() -> u64 {
    HEARTBEAT_PERIOD.as_millis() as u64
}
fn default_max_heartbeat_probe() -> u32 {
    MAX_HEARTBEAT_PROBE
}
fn default_batch_cap() -> usize {
    MAX_BATCH
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            identity: IdentityConfig::default(),
            namespace: NamespaceConfig::default(),
            session: SessionConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            remote: default_remote(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_period_ms: default_heartbeat_period_ms(),
            max_heartbeat_probe: default_max_heartbeat_probe(),
            batch_cap: default_batch_cap(),
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
    /// Returns [`ConfigError`] for unreadable, malformed or invalid files.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_component("identity.device", &self.identity.device)?;
        validate_component("identity.remote", &self.identity.remote)?;
        validate_component("namespace.root", &self.namespace.root)?;
        validate_component("namespace.application", &self.namespace.application)?;
        validate_component("namespace.project", &self.namespace.project)?;
        if self.identity.device == self.identity.remote {
            return Err(ConfigError::Invalid {
                field: "identity.remote",
                reason: "must differ from identity.device".into(),
            });
        }
        if self.session.heartbeat_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session.heartbeat_period_ms",
                reason: "must be non-zero".into(),
            });
        }
        if self.session.batch_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "session.batch_cap",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn device(&self) -> RemoteId {
        RemoteId::new(self.identity.device.clone())
    }

    pub fn remote(&self) -> RemoteId {
        RemoteId::new(self.identity.remote.clone())
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.session.heartbeat_period_ms)
    }

    pub fn sender_settings(&self) -> SenderSettings {
        SenderSettings {
            max_heartbeat_probe: self.session.max_heartbeat_probe,
            batch_cap: self.session.batch_cap,
        }
    }
}

fn validate_component(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value:?} is not a valid name component"),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
