//! # midilink-core
//!
//! Shared library for MIDI-Link containing the naming convention, the control
//! event payload model, the request/response substrate abstraction, the UDP
//! wire codec, and the device collaborator traits.
//!
//! This crate is used by both the sender and the receiver applications.
//!
//! # Architecture overview (for beginners)
//!
//! MIDI-Link carries 3-byte MIDI control events from a *sender* (the peer
//! with the keyboard or controller attached) to a *receiver* (the peer that
//! plays them back).  The two peers never hold a connection open.  Instead
//! they talk over a **pull-based, named request/response substrate**: a peer
//! only ever gets data by asking for it under a unique name, and the other
//! peer answers each name at most once.
//!
//! Everything a real transport needs (sessions, liveness, pacing, access
//! control) is therefore built on top of that substrate by the two
//! application crates.  This crate defines the vocabulary they share:
//!
//! - **`protocol`** – Hierarchical names (`/topo-prefix/bob/midi-ndn/proj/7`),
//!   control events and batches, handshake reply content, protocol constants,
//!   and the binary frame codec used by the UDP substrate.
//!
//! - **`substrate`** – The [`Substrate`] trait plus two implementations: an
//!   in-process [`substrate::memory::MemoryHub`] and a datagram-based
//!   [`substrate::udp::UdpFace`].
//!
//! - **`device`** – Traits for the physical MIDI device on either side.
//!
//! - **`config`** – Configuration fragments both peers read from TOML.

pub mod config;
pub mod device;
pub mod protocol;
pub mod substrate;

// Re-export the most-used types at the crate root so callers can write
// `midilink_core::Name` instead of `midilink_core::protocol::name::Name`.
pub use device::{ControlEventSink, ControlEventSource, DeviceError};
pub use protocol::name::{Name, NameError, NameScheme, ParsedName, RemoteId, Tag};
pub use protocol::payload::{
    decode_batch, encode_batch, ControlEvent, DenyReason, HandshakeReply, PayloadError,
};
pub use substrate::{InboundRequest, RequestOutcome, Substrate, SubstrateError};
