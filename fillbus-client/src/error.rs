//! Client error types.

use fillbus_protocol::{ProtocolError, Status};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("operation timed out")]
    Timeout,

    #[error("peer closed the connection")]
    PeerClosed,

    /// The server refused the operation; carries the status verbatim.
    #[error("server replied {0}")]
    Rejected(Status),

    #[error("response tag id {actual} does not match requested tag id {expected}")]
    TagIdMismatch { expected: u16, actual: u16 },

    #[error("invalid NoOp response")]
    InvalidNoOpResponse,

    #[error("invalid write response")]
    InvalidWriteResponse,
}

impl ClientError {
    /// Returns whether the stream alignment is unknown after this error.
    ///
    /// A connection that produced such an error must be closed: the next
    /// 8 bytes on the wire may be the middle of an exchange.
    pub fn desyncs_stream(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Timeout
                | ClientError::PeerClosed
                | ClientError::Protocol(_)
        )
    }
}
