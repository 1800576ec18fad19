//! Binary frame format.
//!
//! Every frame is exactly 8 bytes, all integer fields little-endian:
//!
//! ```text
//! +-------------------+--------+----------+
//! | command / status  | tag_id | payload  |
//! |      2 bytes      | 2 bytes| 4 bytes  |
//! +-------------------+--------+----------+
//! ```
//!
//! Requests carry a command id in the first field, responses a status code.
//! The payload is opaque at this layer; its meaning is per command.

use crate::command::{Command, Status};
use crate::error::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};

/// Size of every frame on the wire.
pub const FRAME_SIZE: usize = 8;

/// The all-zero payload used by commands with a must-be-zero slot.
pub const ZERO_PAYLOAD: [u8; 4] = [0; 4];

/// A request frame: command, tag id, 4-byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame {
    pub command: Command,
    pub tag_id: u16,
    pub payload: [u8; 4],
}

impl RequestFrame {
    pub fn new(command: Command, tag_id: u16, payload: [u8; 4]) -> Self {
        Self {
            command,
            tag_id,
            payload,
        }
    }

    /// Encodes the frame into its 8-byte wire form.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        buf.put_u16_le(self.command.as_u16());
        buf.put_u16_le(self.tag_id);
        buf.put_slice(&self.payload);
        buf
    }

    /// Decodes a frame from exactly 8 bytes.
    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() != FRAME_SIZE {
            return Err(ProtocolError::InvalidFrameSize(buf.len()));
        }
        let command = Command::from_u16(buf.get_u16_le())?;
        let tag_id = buf.get_u16_le();
        let mut payload = [0u8; 4];
        buf.copy_to_slice(&mut payload);
        Ok(Self {
            command,
            tag_id,
            payload,
        })
    }
}

/// A response frame: status, tag id, 4-byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: Status,
    pub tag_id: u16,
    pub payload: [u8; 4],
}

impl ResponseFrame {
    pub fn new(status: Status, tag_id: u16, payload: [u8; 4]) -> Self {
        Self {
            status,
            tag_id,
            payload,
        }
    }

    /// Encodes the frame into its 8-byte wire form.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        buf.put_u16_le(self.status.as_u16());
        buf.put_u16_le(self.tag_id);
        buf.put_slice(&self.payload);
        buf
    }

    /// Decodes a frame from exactly 8 bytes.
    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() != FRAME_SIZE {
            return Err(ProtocolError::InvalidFrameSize(buf.len()));
        }
        let status = Status::from_u16(buf.get_u16_le())?;
        let tag_id = buf.get_u16_le();
        let mut payload = [0u8; 4];
        buf.copy_to_slice(&mut payload);
        Ok(Self {
            status,
            tag_id,
            payload,
        })
    }
}
