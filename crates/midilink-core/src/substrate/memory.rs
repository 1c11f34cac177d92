//! In-process substrate.
//!
//! A [`MemoryHub`] is a tiny router: every [`MemoryFace`] created from it can
//! register prefixes and express requests, and requests are delivered to the
//! face holding the longest matching prefix.  Pending requests are kept per
//! name and all of them are satisfied by one response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{InboundRequest, RequestOutcome, Substrate, SubstrateError, INBOUND_QUEUE_DEPTH};
use crate::protocol::name::Name;

#[derive(Default)]
struct HubState {
    routes: Vec<(Name, mpsc::Sender<InboundRequest>)>,
    pending: HashMap<Name, Vec<(u64, oneshot::Sender<Vec<u8>>)>>,
    next_ticket: u64,
}

/// Shared router for in-process faces.
#[derive(Default)]
pub struct MemoryHub {
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a face attached to this hub.
    pub fn face(self: &Arc<Self>) -> MemoryFace {
        MemoryFace {
            hub: Arc::clone(self),
        }
    }

    /// Number of requests currently waiting for a response.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().expect("hub lock poisoned");
        state.pending.values().map(Vec::len).sum()
    }
}

/// One attachment to a [`MemoryHub`].
#[derive(Clone)]
pub struct MemoryFace {
    hub: Arc<MemoryHub>,
}

impl MemoryFace {
    fn forget(&self, name: &Name, ticket: u64) {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        if let Some(waiters) = state.pending.get_mut(name) {
            waiters.retain(|(t, _)| *t != ticket);
            if waiters.is_empty() {
                state.pending.remove(name);
            }
        }
    }
}

/// Removes a pending waiter when the requesting future ends, whether it
/// completed, timed out or was dropped mid-await.
struct PendingGuard<'a> {
    face: &'a MemoryFace,
    name: &'a Name,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.face.forget(self.name, self.ticket);
    }
}

#[async_trait]
impl Substrate for MemoryFace {
    async fn express_request(&self, name: Name, lifetime: Duration) -> RequestOutcome {
        let (ticket, rx, route) = {
            let mut state = self.hub.state.lock().expect("hub lock poisoned");
            // Drop handlers that have gone away so they stop shadowing others.
            state.routes.retain(|(_, tx)| !tx.is_closed());
            let route = state
                .routes
                .iter()
                .filter(|(prefix, _)| prefix.is_prefix_of(&name))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, tx)| tx.clone());
            let Some(route) = route else {
                return RequestOutcome::Nack("no route".to_string());
            };
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            let (tx, rx) = oneshot::channel();
            state.pending.entry(name.clone()).or_default().push((ticket, tx));
            (ticket, rx, route)
        };
        let _guard = PendingGuard {
            face: self,
            name: &name,
            ticket,
        };

        if route
            .send(InboundRequest { name: name.clone() })
            .await
            .is_err()
        {
            return RequestOutcome::Nack("handler closed".to_string());
        }

        match tokio::time::timeout(lifetime, rx).await {
            Ok(Ok(content)) => RequestOutcome::Response(content),
            Ok(Err(_)) => RequestOutcome::Nack("request dropped".to_string()),
            Err(_) => RequestOutcome::Timeout,
        }
    }

    async fn register_prefix(
        &self,
        prefix: Name,
    ) -> Result<mpsc::Receiver<InboundRequest>, SubstrateError> {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        state.routes.retain(|(_, tx)| !tx.is_closed());
        if state.routes.iter().any(|(p, _)| *p == prefix) {
            return Err(SubstrateError::PrefixTaken(prefix));
        }
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        debug!("memory hub: registered {prefix}");
        state.routes.push((prefix, tx));
        Ok(rx)
    }

    async fn respond(&self, name: &Name, content: Vec<u8>) -> Result<(), SubstrateError> {
        let waiters = {
            let mut state = self.hub.state.lock().expect("hub lock poisoned");
            state.pending.remove(name)
        };
        let Some(waiters) = waiters else {
            return Err(SubstrateError::Unsolicited(name.clone()));
        };
        for (_, tx) in waiters {
            // The requester may have timed out in the meantime.
            let _ = tx.send(content.clone());
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
