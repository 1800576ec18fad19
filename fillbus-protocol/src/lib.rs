//! # fillbus-protocol
//!
//! Wire protocol for fillbus, the tag exchange protocol spoken between
//! filling machines and MES / data acquisition systems.
//!
//! This crate provides:
//! - Fixed 8-byte binary framing (request and response shapes)
//! - Command and status taxonomies with stable on-wire ids
//! - Padding and frame-count arithmetic for multi-frame string transfers
//! - UTF-16LE / UTF-8 transcoding with explicit failure modes

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod text;

pub use codec::{frames_needed, pad_to_frame_size, string_byte_len};
pub use command::{Command, Status};
pub use error::ProtocolError;
pub use frame::{RequestFrame, ResponseFrame, FRAME_SIZE, ZERO_PAYLOAD};
pub use text::{utf16le_to_utf8, utf8_to_utf16le};

/// Default TCP port for fillbus servers.
pub const DEFAULT_PORT: u16 = 5000;

/// Maximum announced string length in UTF-16 code units (128 KiB on the wire).
///
/// The announced length sizes the multi-frame read on the receiving side; a
/// peer announcing more than this is treated as desynchronized rather than
/// drained.
pub const MAX_STRING_CHARS: u32 = 64 * 1024;
