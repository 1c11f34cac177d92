//! Substrate wiring for the sender.
//!
//! Architecture:
//! - [`SenderNode`] registers `/<root>/<device>/<app>/<project>`; one
//!   dispatch task reads the receiver's pull and shutdown requests.
//! - A drain task answers queued pulls.  It sleeps on a [`Notify`] and is
//!   woken whenever a pull is queued or an event is submitted.
//! - A heartbeat task probes the receiver once per period.  Each probe runs
//!   in its own task with a lifetime of one period, so a slow reply never
//!   delays the next tick.  The task ends once the end-of-session marker
//!   has been drained.
//!
//! ```text
//!  device ──submit──► outbound ─┐
//!                               ├─► drain task ──respond──► receiver
//!  receiver ──pull──► pending ──┘
//!  heartbeat task ──probe──► receiver ──ACCEPTED──► on_heartbeat_reply
//! ```

use std::sync::Arc;
use std::time::Duration;

use midilink_core::{
    ControlEvent, ControlEventSource, HandshakeReply, InboundRequest, NameScheme, RemoteId,
    RequestOutcome, Substrate, SubstrateError, Tag,
};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::outbound_queue::PullDisposition;
use crate::application::session::{LinkState, SenderSession};

/// Everything a running sender shares between its tasks.
pub struct SenderNode {
    substrate: Arc<dyn Substrate>,
    scheme: NameScheme,
    device: RemoteId,
    remote: RemoteId,
    session: Mutex<SenderSession>,
    wake: Notify,
    heartbeat_period: Duration,
}

/// Handles of the tasks started by [`SenderNode::start`].
pub struct SenderTasks {
    pub dispatch: JoinHandle<()>,
    pub drain: JoinHandle<()>,
    pub heartbeat: JoinHandle<()>,
}

impl SenderTasks {
    pub fn abort(&self) {
        self.dispatch.abort();
        self.drain.abort();
        self.heartbeat.abort();
    }
}

impl SenderNode {
    pub fn new(
        substrate: Arc<dyn Substrate>,
        scheme: NameScheme,
        device: RemoteId,
        remote: RemoteId,
        session: SenderSession,
        heartbeat_period: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            substrate,
            scheme,
            device,
            remote,
            session: Mutex::new(session),
            wake: Notify::new(),
            heartbeat_period,
        })
    }

    pub fn device(&self) -> &RemoteId {
        &self.device
    }

    pub fn remote(&self) -> &RemoteId {
        &self.remote
    }

    pub async fn link_state(&self) -> LinkState {
        self.session.lock().await.state()
    }

    /// Runs `f` against the session under its lock.
    pub async fn with_session<T>(&self, f: impl FnOnce(&mut SenderSession) -> T) -> T {
        f(&mut *self.session.lock().await)
    }

    /// Registers our prefix and starts the dispatch, drain and heartbeat
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns the substrate error if the prefix cannot be registered.
    pub async fn start(self: &Arc<Self>) -> Result<SenderTasks, SubstrateError> {
        let prefix = self.scheme.peer_prefix(&self.device);
        let inbound = self.substrate.register_prefix(prefix.clone()).await?;
        info!("sender {} listening on {prefix}", self.device);
        Ok(SenderTasks {
            dispatch: tokio::spawn(Arc::clone(self).dispatch(inbound)),
            drain: tokio::spawn(Arc::clone(self).drain()),
            heartbeat: tokio::spawn(Arc::clone(self).heartbeat()),
        })
    }

    // ── Inbound requests ─────────────────────────────────────────────────────

    async fn dispatch(self: Arc<Self>, mut inbound: mpsc::Receiver<InboundRequest>) {
        while let Some(request) = inbound.recv().await {
            self.handle_request(request).await;
        }
        debug!("sender dispatch loop ended");
    }

    async fn handle_request(&self, request: InboundRequest) {
        let parsed = match self.scheme.parse(&request.name) {
            Ok(p) => p,
            Err(e) => {
                debug!("ignoring request {}: {e}", request.name);
                return;
            }
        };
        match parsed.tag {
            Tag::Seq(seq) => {
                let disposition = self
                    .session
                    .lock()
                    .await
                    .on_pull_request(request.name, seq);
                if disposition == PullDisposition::Queued {
                    self.wake.notify_one();
                }
            }
            Tag::Shutdown => {
                self.session.lock().await.on_shutdown_request();
                // Acknowledge so the receiver's request does not linger.
                if let Err(e) = self.substrate.respond(&request.name, Vec::new()).await {
                    debug!("shutdown acknowledgement not delivered: {e}");
                }
            }
            Tag::Heartbeat => debug!("ignoring heartbeat addressed to a sender"),
        }
    }

    // ── Outbound batches ─────────────────────────────────────────────────────

    /// Queues one device event and wakes the drain task.  Returns `false` if
    /// the event was dropped because the link is down.
    pub async fn submit(&self, event: ControlEvent) -> bool {
        let queued = self.session.lock().await.enqueue(event);
        if queued {
            self.wake.notify_one();
        }
        queued
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let batch = self.session.lock().await.drain_one();
            let Some(batch) = batch else {
                self.wake.notified().await;
                continue;
            };
            debug!("answering {} with {} event(s)", batch.name, batch.events);
            if let Err(e) = self.substrate.respond(&batch.name, batch.content).await {
                warn!("batch for {} not delivered: {e}", batch.name);
            }
            if batch.ends_session {
                info!("end-of-session marker sent to {}", self.remote);
            }
        }
    }

    /// Forwards every event from `source` until it closes, then asks the
    /// receiver to end the session with the all-zero marker.
    pub async fn pump<S: ControlEventSource>(&self, mut source: S) {
        let mut dropped = 0usize;
        while let Some(event) = source.next_event().await {
            if !self.submit(event).await {
                dropped += 1;
            }
        }
        if dropped > 0 {
            info!("{dropped} event(s) dropped while disconnected");
        }
        if self.submit(ControlEvent::SHUTDOWN).await {
            info!("event input closed; ending session with {}", self.remote);
        }
    }

    // ── Heartbeats ───────────────────────────────────────────────────────────

    async fn heartbeat(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.heartbeat_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            {
                let mut session = self.session.lock().await;
                if session.is_finished() {
                    info!("session with {} ended; heartbeat stopped", self.remote);
                    return;
                }
                if session.on_probe_sent() {
                    warn!("lost {}; waiting for it to accept us again", self.remote);
                }
            }
            tokio::spawn(Arc::clone(&self).probe());
        }
    }

    async fn probe(self: Arc<Self>) {
        let name = self.scheme.heartbeat_name(&self.remote, &self.device);
        let content = match self
            .substrate
            .express_request(name.clone(), self.heartbeat_period)
            .await
        {
            RequestOutcome::Response(content) => content,
            other => {
                debug!("heartbeat {name} unanswered: {other:?}");
                return;
            }
        };
        match HandshakeReply::from_bytes(&content) {
            Ok(reply) => {
                self.session.lock().await.on_heartbeat_reply(reply);
            }
            Err(e) => warn!("heartbeat {name}: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
