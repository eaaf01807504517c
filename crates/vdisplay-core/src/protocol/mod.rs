//! Protocol module containing the session message types and the frame codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_frame, encode_frame, ProtocolError};
pub use messages::*;
