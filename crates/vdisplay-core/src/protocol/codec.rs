//! Binary codec for framing session messages.
//!
//! Wire format:
//! ```text
//! [version:1][payload_len:4][payload:N]
//! ```
//! Total header size: 5 bytes. The length field is big-endian and counts
//! payload bytes only. The payload is the bincode encoding of one
//! [`ProviderMessage`](crate::protocol::messages::ProviderMessage) or
//! [`ServerMessage`](crate::protocol::messages::ServerMessage).
//!
//! This module operates on byte slices only; async socket I/O lives in the
//! transport layer of the provider crate.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 5;

/// Upper bound on a frame payload. Control-plane messages are small; a
/// frame larger than this indicates a corrupted or hostile peer.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the declared frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The declared payload length exceeds [`MAX_PAYLOAD_SIZE`].
    #[error("frame payload of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// The message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The payload bytes could not be parsed as the expected message type.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Encodes a message into a framed byte vector including the 5-byte header.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails, or
/// [`ProtocolError::FrameTooLarge`] if the payload exceeds the frame limit.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = bincode::serialize(msg).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(PROTOCOL_VERSION);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes one message from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are truncated, carry an unknown
/// version, declare an oversized payload, or fail to parse.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<(T, usize), ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    let msg = bincode::deserialize(&bytes[HEADER_SIZE..total])
        .map_err(|e| ProtocolError::Decode(e.to_string()))?;
    Ok((msg, total))
}
