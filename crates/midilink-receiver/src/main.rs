//! MIDI-Link receiver entry point.
//!
//! Wires together the UDP substrate face, the receiver node, the inactivity
//! sweeper and the operator console, then runs until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ AppConfig::load()          -- TOML, defaults when absent
//!  └─ UdpFace::bind()            -- substrate face with static routes
//!  └─ ReceiverNode::start()      -- prefix registration + dispatch loop
//!  └─ spawn_sweeper()            -- inactivity sweep every period
//!  └─ run_console()              -- stdin commands (unless --no-console)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use midilink_core::config::default_config_path;
use midilink_core::substrate::udp::UdpFace;
use midilink_receiver::application::operator::OperatorCommand;
use midilink_receiver::application::state::ReceiverState;
use midilink_receiver::infrastructure::console::run_console;
use midilink_receiver::infrastructure::device::TracingSink;
use midilink_receiver::infrastructure::network::ReceiverNode;
use midilink_receiver::infrastructure::storage::config::AppConfig;
use midilink_receiver::infrastructure::sweeper::spawn_sweeper;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MIDI-Link playback peer.
#[derive(Debug, Parser)]
#[command(
    name = "midilink-receiver",
    about = "Pulls MIDI control events from remote senders and plays them back",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "MIDILINK_RECEIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `identity.peer`: the name senders address this receiver by.
    #[arg(long, env = "MIDILINK_PEER")]
    peer: Option<String>,

    /// Overrides `namespace.project`.
    #[arg(long, env = "MIDILINK_PROJECT")]
    project: Option<String>,

    /// Overrides `network.bind`.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log at debug level when `RUST_LOG` is unset.
    #[arg(short, long)]
    verbose: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    no_console: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let path = match &self.config {
            Some(p) => p.clone(),
            None => default_config_path("receiver.toml")?,
        };
        let mut config =
            AppConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;
        if let Some(peer) = &self.peer {
            config.identity.peer = peer.clone();
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
        .init();

    info!("MIDI-Link receiver starting as {}", config.identity.peer);

    // ── Substrate face ────────────────────────────────────────────────────────
    let face = UdpFace::bind(config.network.bind, config.network.routes.clone())
        .await
        .with_context(|| format!("binding {}", config.network.bind))?;
    info!("substrate face bound on {}", face.local_addr()?);

    // ── Receiver node ─────────────────────────────────────────────────────────
    let node = ReceiverNode::new(
        Arc::new(face),
        config.namespace.scheme(),
        config.identity(),
        ReceiverState::new(config.session_settings(), config.access.clone()),
        Arc::new(TracingSink::new()),
        config.pull_lifetime(),
    );
    let dispatch = node.start().await.context("registering receiver prefix")?;
    let sweeper = spawn_sweeper(node.state(), config.sweep_period());

    // ── Operator console ──────────────────────────────────────────────────────
    let console = if cli.no_console {
        None
    } else {
        let node = Arc::clone(&node);
        Some(tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = run_console(stdin, tokio::io::stdout(), node).await {
                error!("console stopped: {e}");
            }
        }))
    };

    info!("MIDI-Link receiver ready.  Press Ctrl-C to exit.");

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutdown signal received");

    let closed = node.state().lock().await.execute(OperatorCommand::Clear);
    for remote in closed.closed {
        node.send_shutdown(remote);
    }
    // Give the fire-and-forget shutdown requests a moment to leave the socket.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    if let Some(console) = console {
        console.abort();
    }
    sweeper.abort();
    dispatch.abort();

    info!("MIDI-Link receiver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
