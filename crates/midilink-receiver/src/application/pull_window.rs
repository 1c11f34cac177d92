//! Sliding pull window.
//!
//! # How the window moves (for beginners)
//!
//! When a session is established the receiver expresses `prewarm_amount`
//! pull requests back to back, so `[min_seq, max_seq) = [0, 5)` with the
//! default of five.  Responses can then arrive in any order:
//!
//! ```text
//! response s=2 arrives, window [0, 5):
//!     diff      = 2 - 0 + 1 = 3
//!     min_seq  += 3          -> 3
//!     request 5, 6, 7        -> max_seq = 8
//! window is now [3, 8): still five in flight
//! ```
//!
//! Responses below `min_seq` were already covered by a later one and are
//! dropped.  Responses at or above `max_seq` were never requested.  Both are
//! logged and ignored; neither moves the window, so a duplicate response is
//! harmless.
//!
//! A pull that times out or is nacked leaves a hole at its sequence number.
//! The network layer re-expresses it for as long as
//! [`ReceiverState::is_outstanding`] says the slot is still open.

use midilink_core::{decode_batch, ControlEventSink, PayloadError, RemoteId};
use tracing::{debug, warn};

use super::channels::ChannelId;
use super::state::{PullTicket, ReceiverState};

/// What a pull response did to the session.
#[derive(Debug)]
pub enum WindowUpdate {
    /// No live session for the remote.
    NoSession,
    /// The ticket belongs to a session that has since been destroyed, even if
    /// the same remote has connected again.
    SessionEnded,
    /// `seq` was below the window.
    Stale { seq: u64, min_seq: u64 },
    /// `seq` was at or above the window's high edge.
    OutOfWindow { seq: u64, max_seq: u64 },
    /// The payload was not a whole number of events.
    Malformed(PayloadError),
    /// The batch carried the shutdown sentinel; the session is gone.
    Shutdown { channel: ChannelId, delivered: usize },
    /// The batch was played back and the window slid forward.
    Advanced {
        delivered: usize,
        pulls: Vec<PullTicket>,
    },
}

impl ReceiverState {
    /// Issues the initial burst of pull requests for a new session.
    pub fn prewarm(&mut self, remote: &RemoteId) -> Vec<PullTicket> {
        let amount = self.settings.prewarm_amount;
        self.issue_pulls(remote, amount)
    }

    /// `true` while `ticket`'s session is alive and its sequence number is
    /// still inside `[min_seq, max_seq)`.
    pub fn is_outstanding(&self, ticket: &PullTicket) -> bool {
        if ticket.gone.has_changed().is_err() {
            return false;
        }
        self.blocks
            .get(&ticket.remote)
            .is_some_and(|b| (b.min_seq()..b.max_seq()).contains(&ticket.seq))
    }

    /// Applies a response to the pull request behind `ticket`.
    ///
    /// Unlike [`ReceiverState::on_response`] this refuses responses whose
    /// session was torn down while they were in flight, so they can never
    /// move the window of a newer session for the same remote.
    pub fn apply_ticket_response(
        &mut self,
        ticket: &PullTicket,
        content: &[u8],
        sink: &dyn ControlEventSink,
    ) -> WindowUpdate {
        if ticket.gone.has_changed().is_err() {
            debug!(
                "response {} from {} arrived after its session ended; dropped",
                ticket.seq, ticket.remote
            );
            return WindowUpdate::SessionEnded;
        }
        self.on_response(&ticket.remote, ticket.seq, content, sink)
    }

    /// Applies the response to pull request `seq` from `remote`.
    ///
    /// Events are played back through `sink` in order, stamped with the
    /// session's channel, before the window moves.
    pub fn on_response(
        &mut self,
        remote: &RemoteId,
        seq: u64,
        content: &[u8],
        sink: &dyn ControlEventSink,
    ) -> WindowUpdate {
        let Some(block) = self.blocks.get_mut(remote) else {
            debug!("response {seq} from {remote} has no session; dropped");
            return WindowUpdate::NoSession;
        };
        if seq < block.min_seq() {
            debug!("stale response {seq} from {remote} (min {}); dropped", block.min_seq());
            return WindowUpdate::Stale {
                seq,
                min_seq: block.min_seq(),
            };
        }
        if seq >= block.max_seq() {
            warn!(
                "response {seq} from {remote} is outside the requested window [{}, {}); dropped",
                block.min_seq(),
                block.max_seq()
            );
            return WindowUpdate::OutOfWindow {
                seq,
                max_seq: block.max_seq(),
            };
        }
        let events = match decode_batch(content) {
            Ok(events) => events,
            Err(e) => {
                warn!("response {seq} from {remote}: {e}; dropped");
                return WindowUpdate::Malformed(e);
            }
        };

        block.touch();
        let channel = block.channel();
        let mut delivered = 0;
        for event in events {
            if event.is_shutdown() {
                self.teardown(remote);
                debug!("shutdown sentinel from {remote}; released channel {channel}");
                return WindowUpdate::Shutdown { channel, delivered };
            }
            if let Err(e) = sink.emit(event.on_channel(channel.nibble())) {
                warn!("playback of {event} for {remote} failed: {e}");
            }
            delivered += 1;
        }

        let diff = block.consume_through(seq);
        let pulls = self.issue_pulls(remote, diff);
        WindowUpdate::Advanced { delivered, pulls }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connection_monitor::HandshakeOutcome;
    use midilink_core::{encode_batch, ControlEvent, DeviceError};
    use mockall::{mock, predicate::eq, Sequence};

    mock! {
        Sink {}
        impl ControlEventSink for Sink {
            fn emit(&self, event: ControlEvent) -> Result<(), DeviceError>;
        }
    }

    fn silent_sink() -> MockSink {
        let mut sink = MockSink::new();
        sink.expect_emit().returning(|_| Ok(()));
        sink
    }

    fn established(remote: &str) -> (ReceiverState, RemoteId) {
        let mut st = ReceiverState::default();
        let remote = RemoteId::from(remote);
        assert!(matches!(
            st.on_handshake(&remote),
            HandshakeOutcome::Established { .. }
        ));
        (st, remote)
    }

    fn window(st: &ReceiverState, remote: &RemoteId) -> (u64, u64) {
        let b = st.blocks().get(remote).unwrap();
        (b.min_seq(), b.max_seq())
    }

    #[test]
    fn test_first_response_inside_prewarm_slides_window() {
        // Arrange: window [0, 5)
        let (mut st, alice) = established("alice");

        // Act
        let update = st.on_response(&alice, 2, &[], &silent_sink());

        // Assert
        let WindowUpdate::Advanced { pulls, .. } = update else {
            panic!("expected Advanced");
        };
        assert_eq!(window(&st, &alice), (3, 8));
        let seqs: Vec<u64> = pulls.iter().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![5, 6, 7]);
    }

    #[test]
    fn test_duplicate_response_is_a_no_op() {
        // Arrange
        let (mut st, alice) = established("alice");
        let sink = silent_sink();
        st.on_response(&alice, 0, &[0x90, 60, 100], &sink);
        let before = window(&st, &alice);

        // Act
        let update = st.on_response(&alice, 0, &[0x90, 60, 100], &sink);

        // Assert
        assert!(matches!(update, WindowUpdate::Stale { seq: 0, min_seq: 1 }));
        assert_eq!(window(&st, &alice), before);
    }

    #[test]
    fn test_response_beyond_window_is_dropped() {
        let (mut st, alice) = established("alice");
        let update = st.on_response(&alice, 5, &[], &silent_sink());
        assert!(matches!(update, WindowUpdate::OutOfWindow { seq: 5, max_seq: 5 }));
        assert_eq!(window(&st, &alice), (0, 5));
    }

    #[test]
    fn test_misaligned_payload_leaves_window_unchanged() {
        // Arrange: the sink must never be called.
        let (mut st, alice) = established("alice");
        let mut sink = MockSink::new();
        sink.expect_emit().never();

        // Act
        let update = st.on_response(&alice, 0, &[0x90, 60], &sink);

        // Assert
        assert!(matches!(update, WindowUpdate::Malformed(PayloadError::Misaligned(2))));
        assert_eq!(window(&st, &alice), (0, 5));
    }

    #[test]
    fn test_batch_is_played_in_order_on_session_channel() {
        // Arrange: bob is second, so he plays on channel 1.
        let (mut st, _alice) = established("alice");
        let bob = RemoteId::from("bob");
        st.on_handshake(&bob);
        let batch = encode_batch(&[
            ControlEvent::new(0x90, 60, 100),
            ControlEvent::new(0x80, 60, 0),
        ]);
        let mut sink = MockSink::new();
        let mut seq = Sequence::new();
        sink.expect_emit()
            .with(eq(ControlEvent::new(0x91, 60, 100)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        sink.expect_emit()
            .with(eq(ControlEvent::new(0x81, 60, 0)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        // Act
        let update = st.on_response(&bob, 0, &batch, &sink);

        // Assert
        assert!(matches!(update, WindowUpdate::Advanced { delivered: 2, .. }));
    }

    #[test]
    fn test_sentinel_tears_down_after_delivering_preceding_events() {
        // Arrange
        let (mut st, alice) = established("alice");
        let batch = encode_batch(&[
            ControlEvent::new(0x90, 60, 100),
            ControlEvent::SHUTDOWN,
            ControlEvent::new(0x90, 62, 100),
        ]);
        let mut sink = MockSink::new();
        sink.expect_emit()
            .with(eq(ControlEvent::new(0x90, 60, 100)))
            .times(1)
            .returning(|_| Ok(()));

        // Act
        let update = st.on_response(&alice, 1, &batch, &sink);

        // Assert
        assert!(matches!(update, WindowUpdate::Shutdown { delivered: 1, .. }));
        assert!(st.blocks().is_empty());
        assert_eq!(st.channels().occupied(), 0);
    }

    #[test]
    fn test_response_for_unknown_remote_is_ignored() {
        let mut st = ReceiverState::default();
        let update = st.on_response(&"ghost".into(), 0, &[], &silent_sink());
        assert!(matches!(update, WindowUpdate::NoSession));
    }

    #[test]
    fn test_response_from_replaced_session_is_refused() {
        // Arrange: alice's first session issues its prewarm tickets, then is
        // torn down and replaced by a fresh one.
        let mut st = ReceiverState::default();
        let alice = RemoteId::from("alice");
        let HandshakeOutcome::Established { pulls: old, .. } = st.on_handshake(&alice) else {
            panic!("expected Established");
        };
        st.teardown(&alice);
        assert!(matches!(
            st.on_handshake(&alice),
            HandshakeOutcome::Established { .. }
        ));
        let mut sink = MockSink::new();
        sink.expect_emit().never();

        // Act: the old session's seq 2 answer shows up late.
        let update = st.apply_ticket_response(&old[2], &[0x90, 60, 100], &sink);

        // Assert
        assert!(matches!(update, WindowUpdate::SessionEnded));
        assert_eq!(window(&st, &alice), (0, 5));
    }

    #[test]
    fn test_live_ticket_response_slides_window() {
        let mut st = ReceiverState::default();
        let alice = RemoteId::from("alice");
        let HandshakeOutcome::Established { pulls, .. } = st.on_handshake(&alice) else {
            panic!("expected Established");
        };

        let update = st.apply_ticket_response(&pulls[0], &[0x90, 60, 100], &silent_sink());

        assert!(matches!(update, WindowUpdate::Advanced { delivered: 1, .. }));
        assert_eq!(window(&st, &alice), (1, 6));
    }

    #[test]
    fn test_ticket_is_outstanding_only_inside_live_window() {
        // Arrange
        let mut st = ReceiverState::default();
        let alice = RemoteId::from("alice");
        let HandshakeOutcome::Established { pulls, .. } = st.on_handshake(&alice) else {
            panic!("expected Established");
        };
        assert!(pulls.iter().all(|t| st.is_outstanding(t)));

        // Act: seq 2 answers, so 0 and 1 fall below the window.
        st.on_response(&alice, 2, &[], &silent_sink());

        // Assert
        assert!(!st.is_outstanding(&pulls[0]));
        assert!(!st.is_outstanding(&pulls[1]));
        assert!(st.is_outstanding(&pulls[3]));
        st.teardown(&alice);
        assert!(!st.is_outstanding(&pulls[3]));
    }

    #[test]
    fn test_window_stays_ordered_under_arbitrary_arrivals() {
        // Arrange
        let (mut st, alice) = established("alice");
        let sink = silent_sink();

        // Act + Assert: a shuffled mix of fresh, stale and out-of-window seqs.
        for seq in [3u64, 1, 4, 9, 8, 2, 20, 7, 12, 11, 30, 13] {
            st.on_response(&alice, seq, &[], &sink);
            let (min, max) = window(&st, &alice);
            assert!(min <= max, "min {min} > max {max} after seq {seq}");
            assert_eq!(max - min, 5, "pipeline depth must stay constant");
        }
    }

    #[test]
    fn test_sink_failure_does_not_stop_the_window() {
        let (mut st, alice) = established("alice");
        let mut sink = MockSink::new();
        sink.expect_emit().returning(|event| {
            Err(DeviceError::Rejected {
                event,
                reason: "port closed".into(),
            })
        });

        let update = st.on_response(&alice, 0, &[0x90, 60, 100], &sink);

        assert!(matches!(update, WindowUpdate::Advanced { .. }));
        assert_eq!(window(&st, &alice), (1, 6));
    }
}
