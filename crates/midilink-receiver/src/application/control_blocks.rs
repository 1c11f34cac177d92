//! Per-remote session records.
//!
//! A [`ControlBlock`] exists for a remote exactly while that remote has a
//! live session: it is created when a handshake passes the access and
//! capacity checks and dropped on the shutdown sentinel, on eviction, on
//! revocation, or when the operator clears all sessions.
//!
//! # The pull window (for beginners)
//!
//! ```text
//!          consumed        in flight          not yet requested
//!   ... ───────────────┼──────────────────┼─────────────────────── ...
//!                   min_seq            max_seq
//! ```
//!
//! `min_seq` is the lowest sequence number whose response has not been
//! consumed; `max_seq` is the next sequence number to request.  Their
//! difference is the number of pull requests in flight.
//!
//! # Teardown signal
//!
//! Each block owns a `watch` sender.  Tasks that act on behalf of the session
//! hold a receiver obtained from [`ControlBlock::subscribe`].  Dropping the
//! block closes the channel, which both wakes those tasks and lets them tell a
//! destroyed session apart from a newer session for the same remote.

use std::collections::BTreeMap;

use midilink_core::RemoteId;
use tokio::sync::watch;

use super::channels::ChannelId;

/// Session state for one remote.
#[derive(Debug)]
pub struct ControlBlock {
    min_seq: u64,
    max_seq: u64,
    inactive_time: u32,
    channel: ChannelId,
    teardown: watch::Sender<()>,
}

impl ControlBlock {
    /// A fresh block with an empty window.
    pub fn new(channel: ChannelId) -> Self {
        let (teardown, _) = watch::channel(());
        Self {
            min_seq: 0,
            max_seq: 0,
            inactive_time: 0,
            channel,
            teardown,
        }
    }

    pub fn min_seq(&self) -> u64 {
        self.min_seq
    }

    pub fn max_seq(&self) -> u64 {
        self.max_seq
    }

    pub fn inactive_time(&self) -> u32 {
        self.inactive_time
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Number of pull requests in flight.
    pub fn in_flight(&self) -> u64 {
        self.max_seq - self.min_seq
    }

    /// Whether `seq` lies inside `[min_seq, max_seq)`.
    pub fn in_window(&self, seq: u64) -> bool {
        self.min_seq <= seq && seq < self.max_seq
    }

    /// Records activity from the remote.
    pub fn touch(&mut self) {
        self.inactive_time = 0;
    }

    /// Advances the inactivity counter by one tick and returns the new value.
    pub fn tick(&mut self) -> u32 {
        self.inactive_time = self.inactive_time.saturating_add(1);
        self.inactive_time
    }

    /// Consumes everything up to and including `seq`.
    ///
    /// Returns how far the low edge moved.  The caller guarantees `seq` is in
    /// the window.
    pub(crate) fn consume_through(&mut self, seq: u64) -> u64 {
        debug_assert!(self.in_window(seq));
        let diff = seq - self.min_seq + 1;
        self.min_seq += diff;
        diff
    }

    /// Reserves the next sequence number to request.
    pub(crate) fn reserve_next(&mut self) -> u64 {
        let seq = self.max_seq;
        self.max_seq += 1;
        seq
    }

    /// A receiver that observes this block's destruction.
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.teardown.subscribe()
    }
}

/// Read-only view of one session, for the operator console and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub remote: RemoteId,
    pub channel: ChannelId,
    pub min_seq: u64,
    pub max_seq: u64,
    pub inactive_time: u32,
}

/// All live sessions, keyed by remote.
///
/// A `BTreeMap` keeps listing order stable for the console.
#[derive(Debug, Default)]
pub struct ControlBlockTable {
    blocks: BTreeMap<RemoteId, ControlBlock>,
}

impl ControlBlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, remote: &RemoteId) -> bool {
        self.blocks.contains_key(remote)
    }

    pub fn get(&self, remote: &RemoteId) -> Option<&ControlBlock> {
        self.blocks.get(remote)
    }

    pub fn get_mut(&mut self, remote: &RemoteId) -> Option<&mut ControlBlock> {
        self.blocks.get_mut(remote)
    }

    /// Inserts a block, replacing (and thereby tearing down) any previous one.
    pub fn insert(&mut self, remote: RemoteId, block: ControlBlock) -> Option<ControlBlock> {
        self.blocks.insert(remote, block)
    }

    pub fn remove(&mut self, remote: &RemoteId) -> Option<ControlBlock> {
        self.blocks.remove(remote)
    }

    pub fn remotes(&self) -> Vec<RemoteId> {
        self.blocks.keys().cloned().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&RemoteId, &mut ControlBlock)> {
        self.blocks.iter_mut()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.blocks
            .iter()
            .map(|(remote, b)| SessionSnapshot {
                remote: remote.clone(),
                channel: b.channel,
                min_seq: b.min_seq,
                max_seq: b.max_seq,
                inactive_time: b.inactive_time,
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::channels::ChannelTable;

    fn channel() -> ChannelId {
        ChannelTable::new(1).allocate(&"x".into()).unwrap()
    }

    #[test]
    fn test_new_block_has_empty_window() {
        let block = ControlBlock::new(channel());
        assert_eq!(block.min_seq(), 0);
        assert_eq!(block.max_seq(), 0);
        assert_eq!(block.in_flight(), 0);
        assert!(!block.in_window(0));
    }

    #[test]
    fn test_reserve_and_consume_keep_min_at_most_max() {
        // Arrange
        let mut block = ControlBlock::new(channel());
        for _ in 0..5 {
            block.reserve_next();
        }

        // Act
        let diff = block.consume_through(2);

        // Assert
        assert_eq!(diff, 3);
        assert_eq!(block.min_seq(), 3);
        assert_eq!(block.max_seq(), 5);
        assert!(block.min_seq() <= block.max_seq());
    }

    #[test]
    fn test_touch_resets_inactivity() {
        let mut block = ControlBlock::new(channel());
        block.tick();
        block.tick();
        assert_eq!(block.inactive_time(), 2);
        block.touch();
        assert_eq!(block.inactive_time(), 0);
    }

    #[test]
    fn test_dropping_block_closes_teardown_signal() {
        let block = ControlBlock::new(channel());
        let gone = block.subscribe();
        assert!(gone.has_changed().is_ok());

        drop(block);

        assert!(gone.has_changed().is_err());
    }

    #[test]
    fn test_table_snapshot_is_sorted_by_remote() {
        let mut table = ControlBlockTable::new();
        table.insert("zed".into(), ControlBlock::new(channel()));
        table.insert("amy".into(), ControlBlock::new(channel()));

        let names: Vec<_> = table.snapshot().into_iter().map(|s| s.remote).collect();

        assert_eq!(names, vec![RemoteId::from("amy"), RemoteId::from("zed")]);
    }
}
