//! MIDI-Link sender entry point.
//!
//! Reads control events from stdin (one `90 3c 64`-style line each), keeps a
//! heartbeat link to the configured receiver and serves its pull requests.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ AppConfig::load()          -- TOML, defaults when absent
//!  └─ UdpFace::bind()            -- substrate face with static routes
//!  └─ SenderNode::start()        -- dispatch + drain + heartbeat tasks
//!  └─ SenderNode::pump(stdin)    -- device events into the outbound queue
//! ```
//!
//! The process exits on Ctrl-C, or shortly after stdin closes once the
//! end-of-session marker has had a chance to go out.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use midilink_core::config::default_config_path;
use midilink_core::substrate::udp::UdpFace;
use midilink_sender::application::session::SenderSession;
use midilink_sender::infrastructure::device::HexLineSource;
use midilink_sender::infrastructure::network::SenderNode;
use midilink_sender::infrastructure::storage::config::AppConfig;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MIDI-Link controller peer.
#[derive(Debug, Parser)]
#[command(
    name = "midilink-sender",
    about = "Serves MIDI control events read from stdin to a MIDI-Link receiver",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "MIDILINK_SENDER_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `identity.device`: our own name on the substrate.
    #[arg(long, env = "MIDILINK_DEVICE")]
    device: Option<String>,

    /// Overrides `identity.remote`: the receiver to connect to.
    #[arg(long, env = "MIDILINK_REMOTE")]
    remote: Option<String>,

    /// Overrides `namespace.project`.
    #[arg(long, env = "MIDILINK_PROJECT")]
    project: Option<String>,

    /// Overrides `network.bind`.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log at debug level when `RUST_LOG` is unset.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let path = match &self.config {
            Some(p) => p.clone(),
            None => default_config_path("sender.toml")?,
        };
        let mut config =
            AppConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;
        if let Some(device) = &self.device {
            config.identity.device = device.clone();
        }
        if let Some(remote) = &self.remote {
            config.identity.remote = remote.clone();
        }
        if let Some(project) = &self.project {
            config.namespace.project = project.clone();
        }
        if let Some(bind) = self.bind {
            config.network.bind = bind;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        config.validate().context("invalid command-line override")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "MIDI-Link sender {} starting; receiver is {}",
        config.identity.device, config.identity.remote
    );

    // ── Substrate face ────────────────────────────────────────────────────────
    let face = UdpFace::bind(config.network.bind, config.network.routes.clone())
        .await
        .with_context(|| format!("binding {}", config.network.bind))?;
    info!("substrate face bound on {}", face.local_addr()?);

    // ── Sender node ───────────────────────────────────────────────────────────
    let node = SenderNode::new(
        Arc::new(face),
        config.namespace.scheme(),
        config.device(),
        config.remote(),
        SenderSession::new(config.sender_settings()),
        config.heartbeat_period(),
    );
    let tasks = node.start().await.context("registering sender prefix")?;

    let mut pump = {
        let node = Arc::clone(&node);
        tokio::spawn(async move {
            node.pump(HexLineSource::new(BufReader::new(tokio::io::stdin())))
                .await;
        })
    };

    info!("MIDI-Link sender ready.  Type events on stdin; Ctrl-C to exit.");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl-C")?;
            info!("shutdown signal received");
            pump.abort();
        }
        _ = &mut pump => {
            // Leave the receiver a few pulls' worth of time to collect the
            // end-of-session marker.
            tokio::time::sleep(config.heartbeat_period().min(Duration::from_secs(1))).await;
        }
    }

    tasks.abort();
    info!("MIDI-Link sender stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_apply_on_top_of_defaults() {
        // Arrange
        let cli = Cli::parse_from([
            "midilink-sender",
            "--config",
            "/nonexistent/sender.toml",
            "--device",
            "keys",
            "--remote",
            "studio",
        ]);

        // Act
        let config = cli.load_config().unwrap();

        // Assert
        assert_eq!(config.identity.device, "keys");
        assert_eq!(config.identity.remote, "studio");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_rejects_remote_equal_to_device() {
        let cli = Cli::parse_from([
            "midilink-sender",
            "--config",
            "/nonexistent/sender.toml",
            "--device",
            "same",
            "--remote",
            "same",
        ]);
        assert!(cli.load_config().is_err());
    }
}
