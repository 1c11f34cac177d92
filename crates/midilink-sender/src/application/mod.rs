//! Application layer for the sender.
//!
//! - **`session`** – [`session::SenderSession`], the one record of the
//!   sender's link to its receiver, plus the heartbeat state machine.
//! - **`outbound_queue`** – Pull-request acceptance, event queueing and
//!   batch draining on that same record.
//!
//! No I/O happens here; the infrastructure layer holds the session behind a
//! mutex and acts on what these operations return.

pub mod outbound_queue;
pub mod session;
