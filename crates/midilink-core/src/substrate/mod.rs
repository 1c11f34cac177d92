//! The named request/response substrate.
//!
//! # Semantics (for beginners)
//!
//! The substrate is a *pull* network.  There are exactly three things a peer
//! can do with it:
//!
//! 1. **Express a request** for a name and wait.  The wait ends with the
//!    response content, a timeout once the request lifetime elapses, or a
//!    negative acknowledgement (nack) when nobody can answer the name.
//! 2. **Register a prefix** and receive every request whose name starts with
//!    it.
//! 3. **Respond** to a request it received, by name.  A response satisfies
//!    every request pending under that exact name, once.
//!
//! There is no connection, no ordering guarantee and no retransmission.
//! Session state, pacing and liveness are built on top by the sender and
//! receiver crates.
//!
//! # Implementations
//!
//! - [`memory::MemoryHub`] routes between faces inside one process.  Tests
//!   and the loopback demo use it.
//! - [`udp::UdpFace`] exchanges [`crate::protocol::codec::Frame`]s over UDP
//!   with statically configured routes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::name::Name;

pub mod memory;
pub mod udp;

/// Capacity of the channel that carries inbound requests to a registered
/// prefix handler.
pub const INBOUND_QUEUE_DEPTH: usize = 256;

/// Errors reported by a substrate face.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// Another handler already owns this prefix on this face.
    #[error("prefix {0} is already registered")]
    PrefixTaken(Name),

    /// No request is pending under this name; the response was discarded.
    #[error("no pending request for {0}")]
    Unsolicited(Name),

    /// Socket bind/send failure.
    #[error("substrate I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] crate::protocol::codec::CodecError),
}

/// How an expressed request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The responder answered with this content.
    Response(Vec<u8>),
    /// The request lifetime elapsed without an answer.
    Timeout,
    /// The substrate rejected the request (e.g. no route).
    Nack(String),
}

/// A request delivered to a registered prefix handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub name: Name,
}

/// One attachment point to the substrate.
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Expresses a request for `name` and waits for its outcome.
    async fn express_request(&self, name: Name, lifetime: Duration) -> RequestOutcome;

    /// Registers `prefix`; every request under it is delivered on the
    /// returned receiver.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::PrefixTaken`] if the prefix already has a
    /// handler on this face.
    async fn register_prefix(
        &self,
        prefix: Name,
    ) -> Result<mpsc::Receiver<InboundRequest>, SubstrateError>;

    /// Answers every request pending under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::Unsolicited`] when nothing is waiting for
    /// the name, or an I/O error from the underlying transport.
    async fn respond(&self, name: &Name, content: Vec<u8>) -> Result<(), SubstrateError>;
}
