//! Playback channel pool.
//!
//! The receiver multiplexes every live session onto one MIDI output by giving
//! each remote its own channel.  The pool is a fixed array of slots; a slot is
//! either empty or holds exactly one [`RemoteId`].
//!
//! Allocation is deterministic: the lowest free index wins.  That keeps the
//! channel a sender ends up on predictable across restarts, which matters to
//! whoever is listening to the output.

use std::fmt;

use midilink_core::protocol::limits::CHANNEL_LIMIT;
use midilink_core::RemoteId;
use thiserror::Error;

/// Errors produced by the channel pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Every slot is occupied.
    #[error("all {capacity} playback channels are in use")]
    Full { capacity: usize },
}

/// Index of one playback slot.  Always below [`CHANNEL_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The value stamped into the low nibble of the status byte.
    pub fn nibble(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-size table mapping slots to remotes.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    slots: Vec<Option<RemoteId>>,
}

impl ChannelTable {
    /// Creates an empty table with `capacity` slots, clamped to
    /// `1..=CHANNEL_LIMIT`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, CHANNEL_LIMIT);
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Gives `remote` a slot.
    ///
    /// A remote that already holds a slot gets the same one back, so a remote
    /// never occupies two slots at once.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Full`] when no slot is free.
    pub fn allocate(&mut self, remote: &RemoteId) -> Result<ChannelId, ChannelError> {
        if let Some(existing) = self.slot_of(remote) {
            return Ok(existing);
        }
        let capacity = self.capacity();
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(ChannelError::Full { capacity })?;
        *slot = Some(remote.clone());
        // `index < CHANNEL_LIMIT <= u8::MAX` by construction.
        Ok(ChannelId(index as u8))
    }

    /// Frees a slot.  Releasing an empty or out-of-range slot does nothing.
    pub fn release(&mut self, channel: ChannelId) {
        if let Some(slot) = self.slots.get_mut(channel.index()) {
            *slot = None;
        }
    }

    /// The remote occupying `channel`, if any.
    pub fn holder(&self, channel: ChannelId) -> Option<&RemoteId> {
        self.slots.get(channel.index()).and_then(Option::as_ref)
    }

    /// The slot currently held by `remote`, if any.
    pub fn slot_of(&self, remote: &RemoteId) -> Option<ChannelId> {
        self.slots
            .iter()
            .position(|s| s.as_ref() == Some(remote))
            .map(|i| ChannelId(i as u8))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
