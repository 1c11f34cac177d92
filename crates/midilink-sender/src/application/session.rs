//! The sender's session record and its heartbeat state machine.
//!
//! # Link states (for beginners)
//!
//! ```text
//!              ACCEPTED reply
//!  Disconnected ─────────────► Connected
//!       ▲                          │
//!       │  misses > max_probe      │
//!       └──────────────────────────┘
//!          or shutdown request
//! ```
//!
//! Every heartbeat tick counts as a miss *before* the probe is sent; an
//! `ACCEPTED` reply resets the count.  So a healthy link oscillates between 1
//! and 0, and only a run of unanswered probes pushes it past the limit.
//!
//! Entering either state empties both queues.  Events queued for a session
//! the receiver no longer knows about would otherwise be replayed into the
//! next one.
//!
//! Once a batch carrying the all-zero end-of-session marker has gone out the
//! session is *finished*: no more events are accepted and the heartbeat task
//! stops, so the receiver does not hand a channel to a sender with nothing
//! left to say.

use std::collections::VecDeque;

use midilink_core::protocol::limits::{MAX_BATCH, MAX_HEARTBEAT_PROBE};
use midilink_core::{ControlEvent, HandshakeReply, Name};
use tracing::{info, warn};

/// Whether the receiver currently acknowledges this sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

/// What one `ACCEPTED`/`DENIED` reply did to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyEffect {
    /// First acceptance after being disconnected; queues were reset.
    Connected,
    /// Already connected; the miss counter was reset.
    Refreshed,
    /// The receiver refused us; nothing changed.
    Denied,
}

/// Tunables for one sender session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderSettings {
    /// Consecutive unanswered probes tolerated before disconnecting.
    pub max_heartbeat_probe: u32,
    /// Most events packed into one response.
    pub batch_cap: usize,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            max_heartbeat_probe: MAX_HEARTBEAT_PROBE,
            batch_cap: MAX_BATCH,
        }
    }
}

/// The sender's side of its one link.
///
/// Owned by a mutex in the infrastructure layer; every method here runs
/// under that lock.
#[derive(Debug, Default)]
pub struct SenderSession {
    pub(crate) state: LinkState,
    /// Events captured from the device, oldest first.
    pub(crate) outbound: VecDeque<ControlEvent>,
    /// Accepted pull requests awaiting a batch, oldest first.
    pub(crate) pending: VecDeque<Name>,
    /// One past the highest sequence number accepted this session.
    pub(crate) max_accepted_seq: u64,
    pub(crate) heartbeat_misses: u32,
    /// Set once the end-of-session marker has been handed to the receiver.
    pub(crate) finished: bool,
    pub(crate) settings: SenderSettings,
}

impl SenderSession {
    pub fn new(settings: SenderSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn settings(&self) -> SenderSettings {
        self.settings
    }

    pub fn heartbeat_misses(&self) -> u32 {
        self.heartbeat_misses
    }

    pub fn max_accepted_seq(&self) -> u64 {
        self.max_accepted_seq
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Counts a heartbeat tick.  Call it right before sending the probe.
    ///
    /// Returns `true` exactly when this tick took the link down.
    pub fn on_probe_sent(&mut self) -> bool {
        self.heartbeat_misses = self.heartbeat_misses.saturating_add(1);
        if self.heartbeat_misses > self.settings.max_heartbeat_probe && self.is_connected() {
            warn!(
                "receiver silent for {} heartbeats; disconnecting",
                self.heartbeat_misses
            );
            self.reset(LinkState::Disconnected);
            return true;
        }
        false
    }

    /// Applies the receiver's answer to a heartbeat probe.
    pub fn on_heartbeat_reply(&mut self, reply: HandshakeReply) -> ReplyEffect {
        match reply {
            HandshakeReply::Accepted if self.is_connected() => {
                self.heartbeat_misses = 0;
                ReplyEffect::Refreshed
            }
            HandshakeReply::Accepted => {
                info!("receiver accepted us; connected");
                self.reset(LinkState::Connected);
                ReplyEffect::Connected
            }
            HandshakeReply::Denied(reason) => {
                warn!("receiver denied us: {reason}");
                ReplyEffect::Denied
            }
        }
    }

    /// The receiver asked us to stop.  Returns `true` if we were connected.
    pub fn on_shutdown_request(&mut self) -> bool {
        let was_connected = self.is_connected();
        if was_connected {
            info!("receiver closed our session");
        }
        self.reset(LinkState::Disconnected);
        was_connected
    }

    fn reset(&mut self, state: LinkState) {
        self.state = state;
        self.outbound.clear();
        self.pending.clear();
        self.max_accepted_seq = 0;
        self.heartbeat_misses = 0;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
