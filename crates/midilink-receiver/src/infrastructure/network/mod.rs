//! Substrate wiring for the receiver.
//!
//! Architecture:
//! - [`ReceiverNode`] registers `/<root>/<peer>/<app>/<project>` and runs one
//!   dispatch task that reads inbound requests.  Only heartbeat-tagged
//!   requests are meaningful to a receiver; anything else is logged and
//!   ignored.
//! - Every pull request runs in its own task.  The task waits for either the
//!   response or the session's teardown signal, whichever comes first, then
//!   applies the response under the state lock.  A pull that times out or is
//!   nacked is expressed again while its slot is still inside the window, so
//!   an idle sender always has requests waiting for it.
//! - Shutdown requests to senders are fire-and-forget tasks.
//!
//! ```text
//!  sender ──heartbeat──► dispatch ──lock──► on_handshake ──► respond
//!                                                  │
//!                                                  └─► (short delay) spawn pull tasks
//!  pull task ──express──► sender ──batch──► pull task ──lock──► on_response
//!                                                                  │
//!                                                                  └─► spawn pull tasks
//! ```

use std::sync::Arc;
use std::time::Duration;

use midilink_core::protocol::limits::{PREWARM_DELAY, PULL_RETRY_DELAY, SHUTDOWN_LIFETIME};
use midilink_core::{
    ControlEventSink, InboundRequest, NameScheme, RemoteId, RequestOutcome, Substrate,
    SubstrateError, Tag,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::connection_monitor::HandshakeOutcome;
use crate::application::pull_window::WindowUpdate;
use crate::application::state::{PullTicket, ReceiverState};

/// Everything a running receiver shares between its tasks.
pub struct ReceiverNode {
    substrate: Arc<dyn Substrate>,
    scheme: NameScheme,
    identity: RemoteId,
    state: Arc<Mutex<ReceiverState>>,
    sink: Arc<dyn ControlEventSink>,
    pull_lifetime: Duration,
}

impl ReceiverNode {
    pub fn new(
        substrate: Arc<dyn Substrate>,
        scheme: NameScheme,
        identity: RemoteId,
        state: ReceiverState,
        sink: Arc<dyn ControlEventSink>,
        pull_lifetime: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            substrate,
            scheme,
            identity,
            state: Arc::new(Mutex::new(state)),
            sink,
            pull_lifetime,
        })
    }

    /// Shared handle to the session state, for the sweeper and the console.
    pub fn state(&self) -> Arc<Mutex<ReceiverState>> {
        Arc::clone(&self.state)
    }

    pub fn identity(&self) -> &RemoteId {
        &self.identity
    }

    /// Registers the receiver's prefix and starts the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns the substrate error if the prefix cannot be registered.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, SubstrateError> {
        let prefix = self.scheme.peer_prefix(&self.identity);
        let inbound = self.substrate.register_prefix(prefix.clone()).await?;
        info!("receiver {} listening on {prefix}", self.identity);
        Ok(tokio::spawn(Arc::clone(self).dispatch(inbound)))
    }

    async fn dispatch(self: Arc<Self>, mut inbound: mpsc::Receiver<InboundRequest>) {
        while let Some(request) = inbound.recv().await {
            self.handle_request(request).await;
        }
        debug!("receiver dispatch loop ended");
    }

    async fn handle_request(self: &Arc<Self>, request: InboundRequest) {
        let parsed = match self.scheme.parse(&request.name) {
            Ok(p) => p,
            Err(e) => {
                debug!("ignoring request {}: {e}", request.name);
                return;
            }
        };
        let (Tag::Heartbeat, Some(remote)) = (parsed.tag, parsed.device) else {
            debug!("ignoring non-heartbeat request {}", request.name);
            return;
        };

        let outcome = self.state.lock().await.on_handshake(&remote);
        if let Err(e) = self
            .substrate
            .respond(&request.name, outcome.reply().to_bytes())
            .await
        {
            debug!("heartbeat reply to {remote} not delivered: {e}");
        }

        match outcome {
            HandshakeOutcome::Established { pulls, .. } => {
                let node = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(PREWARM_DELAY).await;
                    node.spawn_pulls(pulls);
                });
            }
            HandshakeOutcome::DeniedAccess { revoked: Some(_) } => self.send_shutdown(remote),
            _ => {}
        }
    }

    fn spawn_pulls(self: &Arc<Self>, tickets: Vec<PullTicket>) {
        for ticket in tickets {
            tokio::spawn(Arc::clone(self).pull(ticket));
        }
    }

    /// Expresses one pull request until it is answered or no longer wanted,
    /// then applies the response.
    async fn pull(self: Arc<Self>, mut ticket: PullTicket) {
        let name = self.scheme.pull_name(&ticket.remote, ticket.seq);
        let content = loop {
            let outcome = tokio::select! {
                outcome = self.substrate.express_request(name.clone(), self.pull_lifetime) => outcome,
                _ = ticket.gone.changed() => {
                    debug!("pull {name} cancelled: session ended");
                    return;
                }
            };
            match outcome {
                RequestOutcome::Response(content) => break content,
                RequestOutcome::Timeout => debug!("pull {name} timed out"),
                RequestOutcome::Nack(reason) => {
                    debug!("pull {name} nacked: {reason}");
                    tokio::select! {
                        _ = tokio::time::sleep(PULL_RETRY_DELAY) => {}
                        _ = ticket.gone.changed() => return,
                    }
                }
            }
            if !self.state.lock().await.is_outstanding(&ticket) {
                debug!("pull {name} no longer in the window; not re-expressed");
                return;
            }
            debug!("re-expressing pull {name}");
        };

        let update = self
            .state
            .lock()
            .await
            .apply_ticket_response(&ticket, &content, self.sink.as_ref());
        match update {
            WindowUpdate::Advanced { pulls, .. } => self.spawn_pulls(pulls),
            WindowUpdate::Shutdown { channel, .. } => {
                info!("{} ended its session; channel {channel} released", ticket.remote);
            }
            _ => {}
        }
    }

    /// Tells `remote` to stop sending.  Fire-and-forget.
    pub fn send_shutdown(self: &Arc<Self>, remote: RemoteId) {
        let name = self.scheme.shutdown_name(&remote);
        let substrate = Arc::clone(&self.substrate);
        tokio::spawn(async move {
            match substrate.express_request(name.clone(), SHUTDOWN_LIFETIME).await {
                RequestOutcome::Response(_) => debug!("shutdown {name} acknowledged"),
                other => debug!("shutdown {name} not acknowledged: {other:?}"),
            }
        });
        warn!("sent shutdown to {remote}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
