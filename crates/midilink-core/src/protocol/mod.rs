//! Protocol module containing the naming convention, payload model, limits,
//! and the binary frame codec.

pub mod codec;
pub mod limits;
pub mod name;
pub mod payload;

pub use codec::{decode_frame, encode_frame, CodecError, Frame};
pub use name::{Name, NameError, NameScheme, ParsedName, RemoteId, Tag};
pub use payload::{decode_batch, encode_batch, ControlEvent, HandshakeReply, PayloadError};
