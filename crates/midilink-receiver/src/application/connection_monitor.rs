//! Handshake and heartbeat handling on the receiver side.
//!
//! # Per-remote state machine
//!
//! ```text
//!            heartbeat, permitted, channel free
//!   NONE ─────────────────────────────────────────► ESTABLISHED
//!    ▲                                                │   │
//!    │          heartbeat, denied by access lists     │   │ heartbeat, permitted
//!    └────────────────────────────────────────────────┘   └──► (inactivity reset)
//! ```
//!
//! The receiver does not distinguish a "handshake" from a "heartbeat": the
//! first heartbeat-tagged request from a remote establishes the session and
//! every later one refreshes it.  The access lists are evaluated each time so
//! that edits take effect at the next heartbeat.

use midilink_core::{DenyReason, HandshakeReply, RemoteId};
use tracing::{debug, info, warn};

use super::access::AccessDecision;
use super::channels::{ChannelError, ChannelId};
use super::control_blocks::ControlBlock;
use super::state::{PullTicket, ReceiverState};

/// What a heartbeat-tagged request led to.
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// A new session was created; `pulls` is the prewarm.
    Established {
        channel: ChannelId,
        pulls: Vec<PullTicket>,
    },
    /// The remote already had a session; its inactivity counter was reset.
    Refreshed,
    /// The access lists refuse the remote.  `revoked` is the channel of the
    /// session that was torn down as a consequence, if one existed.
    DeniedAccess { revoked: Option<ChannelId> },
    /// Every channel is taken.
    DeniedCapacity,
}

impl HandshakeOutcome {
    /// The content to answer the heartbeat request with.
    pub fn reply(&self) -> HandshakeReply {
        match self {
            HandshakeOutcome::Established { .. } | HandshakeOutcome::Refreshed => {
                HandshakeReply::Accepted
            }
            HandshakeOutcome::DeniedAccess { .. } => HandshakeReply::Denied(DenyReason::Access),
            HandshakeOutcome::DeniedCapacity => HandshakeReply::Denied(DenyReason::Capacity),
        }
    }
}

impl ReceiverState {
    /// Handles one heartbeat-tagged request from `remote`.
    ///
    /// Order of checks: access lists first (a denial also tears down an
    /// existing session), then an existing session is refreshed, and only
    /// then is a channel allocated for a new one.
    pub fn on_handshake(&mut self, remote: &RemoteId) -> HandshakeOutcome {
        if self.access.evaluate(remote) == AccessDecision::Deny {
            let revoked = self.teardown(remote);
            match revoked {
                Some(ch) => warn!("access revoked for {remote}; released channel {ch}"),
                None => warn!("connection denied for {remote}: access lists"),
            }
            return HandshakeOutcome::DeniedAccess { revoked };
        }

        if let Some(block) = self.blocks.get_mut(remote) {
            block.touch();
            debug!("heartbeat from {remote}");
            return HandshakeOutcome::Refreshed;
        }

        let channel = match self.channels.allocate(remote) {
            Ok(ch) => ch,
            Err(ChannelError::Full { capacity }) => {
                warn!("connection denied for {remote}: all {capacity} channels in use");
                return HandshakeOutcome::DeniedCapacity;
            }
        };
        self.blocks.insert(remote.clone(), ControlBlock::new(channel));
        let pulls = self.prewarm(remote);
        info!(
            "session established with {remote} on channel {channel} ({} pulls in flight)",
            pulls.len()
        );
        HandshakeOutcome::Established { channel, pulls }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
