//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid frame size: {0} bytes (frames are exactly 8 bytes)")]
    InvalidFrameSize(usize),

    #[error("unknown command id: {0:#06x}")]
    UnknownCommand(u16),

    #[error("unknown status code: {0:#06x}")]
    UnknownStatus(u16),

    #[error("announced string length {chars} exceeds the limit of {max} UTF-16 units")]
    StringTooLong { chars: u32, max: u32 },

    #[error("invalid UTF-16 payload (unpaired surrogate)")]
    InvalidUtf16,

    #[error("incomplete UTF-16 payload (odd byte count)")]
    IncompleteUtf16,
}
