//! The receiver's single session authority.
//!
//! [`ReceiverState`] owns the control blocks, the channel pool and the access
//! lists together.  The network layer keeps it behind one
//! `tokio::sync::Mutex`; every operation on it (handshake, window slide,
//! sweep, console command) runs inside one lock acquisition and therefore
//! applies as a unit.
//!
//! The operations themselves live in the sibling modules
//! (`connection_monitor`, `pull_window`, `eviction`, `operator`), each adding
//! an `impl ReceiverState` block.

use midilink_core::protocol::limits::{MAX_CHANNELS, MAX_INACTIVE_TIME, PREWARM_AMOUNT};
use midilink_core::RemoteId;
use tokio::sync::watch;

use super::access::AccessControl;
use super::channels::{ChannelId, ChannelTable};
use super::control_blocks::{ControlBlockTable, SessionSnapshot};

/// Tunables for session handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Pull requests issued when a session is established.
    pub prewarm_amount: u64,
    /// Sweep ticks a session may stay silent before it is evicted.
    pub max_inactive_time: u32,
    /// Size of the channel pool.
    pub max_channels: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            prewarm_amount: PREWARM_AMOUNT,
            max_inactive_time: MAX_INACTIVE_TIME,
            max_channels: MAX_CHANNELS,
        }
    }
}

/// One pull request the network layer must express.
///
/// `gone` closes when the session the ticket was issued for is destroyed.
#[derive(Debug, Clone)]
pub struct PullTicket {
    pub remote: RemoteId,
    pub seq: u64,
    pub gone: watch::Receiver<()>,
}

/// Control blocks, channels and access lists under one owner.
#[derive(Debug)]
pub struct ReceiverState {
    pub(crate) blocks: ControlBlockTable,
    pub(crate) channels: ChannelTable,
    pub(crate) access: AccessControl,
    pub(crate) settings: SessionSettings,
}

impl ReceiverState {
    pub fn new(settings: SessionSettings, access: AccessControl) -> Self {
        Self {
            blocks: ControlBlockTable::new(),
            channels: ChannelTable::new(settings.max_channels),
            access,
            settings,
        }
    }

    pub fn blocks(&self) -> &ControlBlockTable {
        &self.blocks
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.blocks.snapshot()
    }

    /// Destroys the session for `remote` and frees its channel.
    ///
    /// Returns the released channel, or `None` if there was no session.
    pub fn teardown(&mut self, remote: &RemoteId) -> Option<ChannelId> {
        let block = self.blocks.remove(remote)?;
        self.channels.release(block.channel());
        Some(block.channel())
    }

    /// Reserves `count` consecutive sequence numbers for `remote`, starting at
    /// its current `max_seq`, and returns one ticket per number.
    pub(crate) fn issue_pulls(&mut self, remote: &RemoteId, count: u64) -> Vec<PullTicket> {
        let Some(block) = self.blocks.get_mut(remote) else {
            return Vec::new();
        };
        (0..count)
            .map(|_| PullTicket {
                remote: remote.clone(),
                seq: block.reserve_next(),
                gone: block.subscribe(),
            })
            .collect()
    }
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self::new(SessionSettings::default(), AccessControl::default())
    }
}
