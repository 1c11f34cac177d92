//! Configuration fragments shared by the sender and the receiver.
//!
//! Each application owns its top-level `AppConfig` (see the `storage::config`
//! module of each crate).  The pieces both sides need (the namespace, the UDP
//! network section, and the file-loading helpers) live here so the two
//! config files read the same way.
//!
//! # Serde default values
//!
//! Every field is annotated with `#[serde(default = "...")]`, so a config file
//! only has to mention what it changes and a missing file means "all
//! defaults".

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::name::NameScheme;
use crate::substrate::udp::UdpRoute;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(String),

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Shared sections ───────────────────────────────────────────────────────────

/// `<root>/<application>/<project>` namespace both peers must agree on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_application")]
    pub application: String,
    #[serde(default = "default_project")]
    pub project: String,
}

impl NamespaceConfig {
    pub fn scheme(&self) -> NameScheme {
        NameScheme::new(&self.root, &self.application, &self.project)
    }
}

/// UDP substrate settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Local socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Static forwarding table: which address answers which prefix.
    #[serde(default)]
    pub routes: Vec<UdpRoute>,
}

fn default_root() -> String {
    "topo-prefix".to_string()
}
fn default_application() -> String {
    "midi-ndn".to_string()
}
fn default_project() -> String {
    "tmp-proj".to_string()
}
fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6363))
}

/// Default `tracing` filter used when `RUST_LOG` is unset.
pub fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            application: default_application(),
            project: default_project(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            routes: Vec::new(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves `<platform config dir>/midilink/<file_name>`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the base directory cannot
/// be determined from the environment.
pub fn default_config_path(file_name: &str) -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join(file_name))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads a TOML config from `path`, returning `T::default()` if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_toml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the platform config base directory plus the `midilink` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("MidiLink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("MidiLink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("midilink"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        namespace: NamespaceConfig,
        #[serde(default)]
        network: NetworkConfig,
    }

    #[test]
    fn test_namespace_defaults_match_original_layout() {
        let ns = NamespaceConfig::default();
        assert_eq!(ns.root, "topo-prefix");
        assert_eq!(ns.application, "midi-ndn");
        assert_eq!(ns.project, "tmp-proj");
    }

    #[test]
    fn test_network_section_parses_routes() {
        // Arrange
        let text = r#"
[network]
bind = "127.0.0.1:7000"
routes = [{ prefix = "/topo-prefix/alice", addr = "10.0.0.2:6363" }]
"#;

        // Act
        let cfg: Sample = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.network.bind.port(), 7000);
        assert_eq!(cfg.network.routes.len(), 1);
        assert_eq!(cfg.network.routes[0].prefix.to_string(), "/topo-prefix/alice");
        assert_eq!(cfg.namespace, NamespaceConfig::default());
    }

    #[test]
    fn test_load_toml_returns_default_when_file_absent() {
        let path = Path::new("/nonexistent/path/that/cannot/exist/midilink.toml");
        let cfg: Sample = load_toml(path).unwrap();
        assert_eq!(cfg, Sample::default());
    }

    #[test]
    fn test_load_toml_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("midilink_cfg_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result: Result<Sample, _> = load_toml(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_default_config_path_ends_with_file_name() {
        if let Ok(path) = default_config_path("receiver.toml") {
            assert!(path.ends_with("midilink/receiver.toml") || path.ends_with("receiver.toml"));
        }
    }
}
