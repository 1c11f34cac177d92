//! Periodic inactivity sweep.
//!
//! Every `period` the sweeper takes the state lock once and ages all sessions
//! by one tick (see `ReceiverState::sweep`).  Missed ticks are delayed rather
//! than bursted, so a stalled runtime never evicts several ticks' worth of
//! sessions at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::application::state::ReceiverState;

/// Spawns the sweep loop.  Abort the handle to stop it.
pub fn spawn_sweeper(state: Arc<Mutex<ReceiverState>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick resolves immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = state.lock().await.sweep();
            if !evicted.is_empty() {
                debug!("sweep evicted {} session(s)", evicted.len());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::AccessControl;
    use crate::application::state::SessionSettings;

    #[tokio::test]
    async fn test_sweeper_evicts_silent_session() {
        // Arrange: two tolerated ticks, 10 ms apart.
        let settings = SessionSettings {
            max_inactive_time: 2,
            ..SessionSettings::default()
        };
        let state = Arc::new(Mutex::new(ReceiverState::new(settings, AccessControl::default())));
        state.lock().await.on_handshake(&"alice".into());

        // Act
        let sweeper = spawn_sweeper(Arc::clone(&state), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sweeper.abort();

        // Assert
        let state = state.lock().await;
        assert!(state.blocks().is_empty());
        assert_eq!(state.channels().occupied(), 0);
    }
}
