//! Inactivity sweep.
//!
//! Senders that crash or lose connectivity never send the shutdown sentinel,
//! so their channels would stay taken forever.  The sweep ages every session
//! by one tick; heartbeats and valid responses reset the age.  A session
//! older than `max_inactive_time` ticks is removed.

use midilink_core::RemoteId;
use tracing::info;

use super::channels::ChannelId;
use super::state::ReceiverState;

/// A session removed by [`ReceiverState::sweep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted {
    pub remote: RemoteId,
    pub channel: ChannelId,
}

impl ReceiverState {
    /// Ages every session by one tick and evicts the ones past the limit.
    pub fn sweep(&mut self) -> Vec<Evicted> {
        let limit = self.settings.max_inactive_time;
        let expired: Vec<RemoteId> = self
            .blocks
            .iter_mut()
            .filter_map(|(remote, block)| (block.tick() > limit).then(|| remote.clone()))
            .collect();

        expired
            .into_iter()
            .filter_map(|remote| {
                let channel = self.teardown(&remote)?;
                info!("evicting {remote}: inactive for more than {limit} ticks");
                Some(Evicted { remote, channel })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::AccessControl;
    use crate::application::connection_monitor::HandshakeOutcome;
    use crate::application::state::SessionSettings;

    fn state_with_one_channel() -> ReceiverState {
        let settings = SessionSettings {
            max_channels: 1,
            ..SessionSettings::default()
        };
        ReceiverState::new(settings, AccessControl::default())
    }

    #[test]
    fn test_silent_session_is_evicted_after_limit_and_channel_is_reusable() {
        // Arrange: the only channel is taken by alice.
        let mut st = state_with_one_channel();
        let alice = RemoteId::from("alice");
        st.on_handshake(&alice);
        assert!(matches!(
            st.on_handshake(&"bob".into()),
            HandshakeOutcome::DeniedCapacity
        ));
        let limit = st.settings().max_inactive_time;

        // Act: `limit` ticks are tolerated, the next one evicts.
        for _ in 0..limit {
            assert!(st.sweep().is_empty());
        }
        let evicted = st.sweep();

        // Assert
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].remote, alice);
        assert!(matches!(
            st.on_handshake(&"bob".into()),
            HandshakeOutcome::Established { .. }
        ));
    }

    #[test]
    fn test_heartbeat_keeps_session_alive() {
        let mut st = ReceiverState::default();
        let alice = RemoteId::from("alice");
        st.on_handshake(&alice);

        for _ in 0..(st.settings().max_inactive_time * 3) {
            st.sweep();
            st.on_handshake(&alice);
        }

        assert!(st.blocks().contains(&alice));
    }

    #[test]
    fn test_sweep_only_evicts_expired_sessions() {
        // Arrange
        let mut st = ReceiverState::default();
        let old = RemoteId::from("old");
        let fresh = RemoteId::from("fresh");
        st.on_handshake(&old);
        let limit = st.settings().max_inactive_time;
        for _ in 0..limit {
            st.sweep();
        }
        st.on_handshake(&fresh);

        // Act
        let evicted = st.sweep();

        // Assert
        assert_eq!(evicted.iter().map(|e| &e.remote).collect::<Vec<_>>(), vec![&old]);
        assert!(st.blocks().contains(&fresh));
    }
}
