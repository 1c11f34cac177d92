//! UDP substrate face.
//!
//! Every request, response and nack travels as one datagram carrying a
//! [`Frame`].  Requests are forwarded to the address of the longest matching
//! entry in a static route table; responses go back to every address that
//! asked for the name and whose request has not yet expired.
//!
//! The face owns a background task that reads the socket.  It is aborted when
//! the face is dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{InboundRequest, RequestOutcome, Substrate, SubstrateError, INBOUND_QUEUE_DEPTH};
use crate::protocol::codec::{decode_frame, encode_frame, Frame};
use crate::protocol::name::Name;

/// Receive buffer size: the largest UDP payload.
const RECV_BUFFER: usize = 65_535;

/// A static forwarding entry: requests under `prefix` go to `addr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpRoute {
    pub prefix: Name,
    pub addr: SocketAddr,
}

type Waiter = (Uuid, oneshot::Sender<RequestOutcome>);

#[derive(Default)]
struct FaceState {
    routes: Vec<UdpRoute>,
    handlers: Vec<(Name, mpsc::Sender<InboundRequest>)>,
    /// Requests we expressed and are waiting on.
    outgoing: HashMap<Name, Vec<Waiter>>,
    /// Requests others expressed to us: who to answer, and until when.
    incoming: HashMap<Name, Vec<(SocketAddr, Instant)>>,
}

impl FaceState {
    fn route_for(&self, name: &Name) -> Option<SocketAddr> {
        self.routes
            .iter()
            .filter(|r| r.prefix.is_prefix_of(name))
            .max_by_key(|r| r.prefix.len())
            .map(|r| r.addr)
    }

    fn handler_for(&self, name: &Name) -> Option<mpsc::Sender<InboundRequest>> {
        self.handlers
            .iter()
            .filter(|(p, tx)| p.is_prefix_of(name) && !tx.is_closed())
            .max_by_key(|(p, _)| p.len())
            .map(|(_, tx)| tx.clone())
    }

    fn forget_outgoing(&mut self, name: &Name, nonce: Uuid) -> Option<oneshot::Sender<RequestOutcome>> {
        let waiters = self.outgoing.get_mut(name)?;
        let idx = waiters.iter().position(|(n, _)| *n == nonce)?;
        let (_, tx) = waiters.swap_remove(idx);
        if waiters.is_empty() {
            self.outgoing.remove(name);
        }
        Some(tx)
    }

    /// Drops every remembered requester whose lifetime has run out.
    fn prune_incoming(&mut self, now: Instant) {
        self.incoming.retain(|_, requesters| {
            requesters.retain(|(_, until)| *until > now);
            !requesters.is_empty()
        });
    }
}

/// Removes an outgoing waiter when the requesting future ends, including
/// when it is dropped before the response or timeout arrives.
struct OutgoingGuard<'a> {
    state: &'a Mutex<FaceState>,
    name: &'a Name,
    nonce: Uuid,
}

impl Drop for OutgoingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.forget_outgoing(self.name, self.nonce);
        }
    }
}

/// A substrate face bound to one UDP socket.
pub struct UdpFace {
    socket: Arc<UdpSocket>,
    state: Arc<Mutex<FaceState>>,
    reader: JoinHandle<()>,
}

impl UdpFace {
    /// Binds `addr` and starts the socket reader.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::Io`] if the socket cannot be bound.
    pub async fn bind(addr: SocketAddr, routes: Vec<UdpRoute>) -> Result<Self, SubstrateError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let state = Arc::new(Mutex::new(FaceState {
            routes,
            ..FaceState::default()
        }));
        let reader = tokio::spawn(read_loop(Arc::clone(&socket), Arc::clone(&state)));
        Ok(Self {
            socket,
            state,
            reader,
        })
    }

    /// The address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from `getsockname`.
    pub fn local_addr(&self) -> Result<SocketAddr, SubstrateError> {
        Ok(self.socket.local_addr()?)
    }

    /// Adds a forwarding entry at runtime.
    pub fn add_route(&self, route: UdpRoute) {
        self.state.lock().expect("face lock poisoned").routes.push(route);
    }
}

impl Drop for UdpFace {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Substrate for UdpFace {
    async fn express_request(&self, name: Name, lifetime: Duration) -> RequestOutcome {
        let nonce = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let target = {
            let mut state = self.state.lock().expect("face lock poisoned");
            let Some(target) = state.route_for(&name) else {
                return RequestOutcome::Nack("no route".to_string());
            };
            state.outgoing.entry(name.clone()).or_default().push((nonce, tx));
            target
        };
        let _guard = OutgoingGuard {
            state: &self.state,
            name: &name,
            nonce,
        };

        let frame = Frame::Request {
            nonce,
            name: name.clone(),
            lifetime_ms: lifetime.as_millis().min(u32::MAX as u128) as u32,
        };
        let sent = match encode_frame(&frame) {
            Ok(bytes) => self.socket.send_to(&bytes, target).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(reason) = sent {
            return RequestOutcome::Nack(reason);
        }

        match tokio::time::timeout(lifetime, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => RequestOutcome::Nack("request dropped".to_string()),
            Err(_) => RequestOutcome::Timeout,
        }
    }

    async fn register_prefix(
        &self,
        prefix: Name,
    ) -> Result<mpsc::Receiver<InboundRequest>, SubstrateError> {
        let mut state = self.state.lock().expect("face lock poisoned");
        state.handlers.retain(|(_, tx)| !tx.is_closed());
        if state.handlers.iter().any(|(p, _)| *p == prefix) {
            return Err(SubstrateError::PrefixTaken(prefix));
        }
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        state.handlers.push((prefix, tx));
        Ok(rx)
    }

    async fn respond(&self, name: &Name, content: Vec<u8>) -> Result<(), SubstrateError> {
        let now = Instant::now();
        let requesters: Vec<SocketAddr> = {
            let mut state = self.state.lock().expect("face lock poisoned");
            state
                .incoming
                .remove(name)
                .unwrap_or_default()
                .into_iter()
                .filter(|(_, deadline)| *deadline > now)
                .map(|(addr, _)| addr)
                .collect()
        };
        if requesters.is_empty() {
            return Err(SubstrateError::Unsolicited(name.clone()));
        }

        let bytes = encode_frame(&Frame::Response {
            name: name.clone(),
            content,
        })?;
        for addr in requesters {
            self.socket.send_to(&bytes, addr).await?;
        }
        Ok(())
    }
}

/// Reads datagrams until the face is dropped.
async fn read_loop(socket: Arc<UdpSocket>, state: Arc<Mutex<FaceState>>) {
    let mut buf = vec![0u8; RECV_BUFFER];
    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                // ICMP port-unreachable surfaces here on some platforms.
                debug!("udp face: recv error: {e}");
                continue;
            }
        };
        let frame = match decode_frame(&buf[..len]) {
            Ok(f) => f,
            Err(e) => {
                warn!("udp face: dropping malformed datagram from {src}: {e}");
                continue;
            }
        };

        match frame {
            Frame::Request {
                nonce,
                name,
                lifetime_ms,
            } => {
                let handler = {
                    let mut state = state.lock().expect("face lock poisoned");
                    let now = Instant::now();
                    state.prune_incoming(now);
                    let handler = state.handler_for(&name);
                    if handler.is_some() {
                        let deadline = now + Duration::from_millis(u64::from(lifetime_ms));
                        let entry = state.incoming.entry(name.clone()).or_default();
                        entry.retain(|(addr, _)| *addr != src);
                        entry.push((src, deadline));
                    }
                    handler
                };
                match handler {
                    Some(tx) => {
                        if tx.try_send(InboundRequest { name: name.clone() }).is_err() {
                            warn!("udp face: handler queue full, dropping request {name}");
                        }
                    }
                    None => {
                        let nack = Frame::Nack {
                            nonce,
                            name,
                            reason: "no route".to_string(),
                        };
                        if let Ok(bytes) = encode_frame(&nack) {
                            let _ = socket.send_to(&bytes, src).await;
                        }
                    }
                }
            }
            Frame::Response { name, content } => {
                let waiters = state
                    .lock()
                    .expect("face lock poisoned")
                    .outgoing
                    .remove(&name)
                    .unwrap_or_default();
                if waiters.is_empty() {
                    debug!("udp face: unsolicited response for {name}");
                }
                for (_, tx) in waiters {
                    let _ = tx.send(RequestOutcome::Response(content.clone()));
                }
            }
            Frame::Nack {
                nonce,
                name,
                reason,
            } => {
                let waiter = state
                    .lock()
                    .expect("face lock poisoned")
                    .forget_outgoing(&name, nonce);
                if let Some(tx) = waiter {
                    let _ = tx.send(RequestOutcome::Nack(reason));
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
