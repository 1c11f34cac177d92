//! Outbound queues: which pull requests to answer and with what.
//!
//! Two FIFOs live on [`SenderSession`]:
//!
//! - `outbound` – control events captured from the device;
//! - `pending`  – pull requests the receiver sent that are still unanswered.
//!
//! A batch goes out only when both are non-empty: the oldest pending name
//! gets up to `batch_cap` of the oldest events.  Requests are accepted only
//! in non-decreasing sequence order, so a retransmitted or reordered pull
//! cannot make the sender answer the same slot twice.

use midilink_core::{encode_batch, ControlEvent, Name};
use tracing::{debug, trace, warn};

use super::session::SenderSession;

/// What [`SenderSession::on_pull_request`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullDisposition {
    /// Not connected; the request was dropped.
    NotConnected,
    /// `seq` is below the next acceptable sequence number; dropped.
    Stale { seq: u64, max_accepted: u64 },
    /// Queued for the next batch.
    Queued,
}

/// One response ready to leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub name: Name,
    pub content: Vec<u8>,
    pub events: usize,
    /// The batch carries the end-of-session marker.
    pub ends_session: bool,
}

impl SenderSession {
    /// Accepts or drops the pull request `name` carrying sequence `seq`.
    pub fn on_pull_request(&mut self, name: Name, seq: u64) -> PullDisposition {
        if !self.is_connected() {
            warn!("pull {name} while disconnected; dropped");
            return PullDisposition::NotConnected;
        }
        if seq < self.max_accepted_seq {
            debug!(
                "pull {name} out of order (next acceptable {}); dropped",
                self.max_accepted_seq
            );
            return PullDisposition::Stale {
                seq,
                max_accepted: self.max_accepted_seq,
            };
        }
        self.max_accepted_seq = seq + 1;
        self.pending.push_back(name);
        PullDisposition::Queued
    }

    /// Queues one device event.  Returns `false` if it was dropped because
    /// the link is down or the session has already ended.
    pub fn enqueue(&mut self, event: ControlEvent) -> bool {
        if !self.is_connected() {
            trace!("event {event} dropped: not connected");
            return false;
        }
        if self.finished {
            trace!("event {event} dropped: session already ended");
            return false;
        }
        self.outbound.push_back(event);
        true
    }

    /// `true` when [`SenderSession::drain_one`] would produce a batch.
    pub fn can_drain(&self) -> bool {
        self.is_connected() && !self.outbound.is_empty() && !self.pending.is_empty()
    }

    /// Pops the oldest pending request and up to `batch_cap` events.
    ///
    /// Handing out the end-of-session marker finishes the session.
    pub fn drain_one(&mut self) -> Option<Batch> {
        if !self.can_drain() {
            return None;
        }
        let name = self.pending.pop_front()?;
        let take = self.outbound.len().min(self.settings.batch_cap);
        let events: Vec<ControlEvent> = self.outbound.drain(..take).collect();
        let ends_session = events.iter().any(ControlEvent::is_shutdown);
        if ends_session {
            self.finished = true;
        }
        Some(Batch {
            name,
            content: encode_batch(&events),
            events: events.len(),
            ends_session,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
