//! Command handlers.
//!
//! Each handler implements the server half of one command as a pure
//! function over the tag store: the connection loop reads whole frames
//! (including any WriteString body frames) before dispatching, so handlers
//! never touch the socket and can be exercised without I/O.

use bytes::BytesMut;
use fillbus_protocol::{codec, text, Command, RequestFrame, ResponseFrame, Status, ZERO_PAYLOAD};
use fillbus_registry::{TagStore, TagType, TagValue};
use std::sync::Arc;

/// A handler reply: one response frame, optionally followed by padded
/// string-body frames.
#[derive(Debug)]
pub struct Reply {
    pub frame: ResponseFrame,
    pub body: Option<BytesMut>,
}

impl Reply {
    fn new(status: Status, tag_id: u16, payload: [u8; 4]) -> Self {
        Self {
            frame: ResponseFrame::new(status, tag_id, payload),
            body: None,
        }
    }

    fn implausible(tag_id: u16) -> Self {
        Self::new(Status::ImplausibleArgument, tag_id, ZERO_PAYLOAD)
    }

    fn unauthorized(tag_id: u16) -> Self {
        Self::new(Status::UnauthorizedAccess, tag_id, ZERO_PAYLOAD)
    }
}

/// Dispatches decoded requests to per-command handlers.
pub struct CommandHandler {
    store: Arc<dyn TagStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    /// Handles one request.
    ///
    /// `body` carries the already-read WriteString body frames (padded) and
    /// is ignored by every other command. Reserved commands answer
    /// `UnknownCommand` with tag id 0, like ids outside the table.
    pub fn dispatch(&self, request: RequestFrame, body: Option<Vec<u8>>) -> Reply {
        match request.command {
            Command::NoOp => self.handle_noop(request),
            Command::ReadSingleValue => self.handle_read_value(request),
            Command::WriteSingleValue => self.handle_write_value(request),
            Command::ReadString => self.handle_read_string(request),
            Command::WriteString => {
                self.handle_write_string(request, body.unwrap_or_default())
            }
            Command::ReadList | Command::WriteList => {
                tracing::warn!("reserved command {} rejected", request.command);
                Reply::new(Status::UnknownCommand, 0, ZERO_PAYLOAD)
            }
        }
    }

    fn handle_noop(&self, request: RequestFrame) -> Reply {
        if request.tag_id == 0 && request.payload == ZERO_PAYLOAD {
            Reply::new(Status::Alive, 0, ZERO_PAYLOAD)
        } else {
            Reply::implausible(request.tag_id)
        }
    }

    fn handle_read_value(&self, request: RequestFrame) -> Reply {
        if request.payload != ZERO_PAYLOAD {
            return Reply::implausible(request.tag_id);
        }
        let tag = match self.store.get(request.tag_id) {
            Some(tag) => tag,
            None => return Reply::implausible(request.tag_id),
        };
        if tag.data_type() == TagType::String {
            // Strings go through ReadString.
            return Reply::implausible(request.tag_id);
        }
        if !tag.access.is_readable() {
            return Reply::unauthorized(request.tag_id);
        }
        Reply::new(Status::Successful, request.tag_id, tag.value.to_payload())
    }

    fn handle_write_value(&self, request: RequestFrame) -> Reply {
        let tag = match self.store.get(request.tag_id) {
            Some(tag) => tag,
            None => return Reply::implausible(request.tag_id),
        };
        let value = match TagValue::from_payload(tag.data_type(), request.payload) {
            Some(value) => value,
            None => return Reply::implausible(request.tag_id),
        };
        if !tag.access.is_writable() {
            return Reply::unauthorized(request.tag_id);
        }
        match self.store.update_value(request.tag_id, value) {
            Ok(()) => Reply::new(Status::Successful, request.tag_id, ZERO_PAYLOAD),
            Err(e) => {
                tracing::warn!("write to tag {} failed: {}", request.tag_id, e);
                Reply::new(Status::WriteNotSuccessful, request.tag_id, ZERO_PAYLOAD)
            }
        }
    }

    fn handle_read_string(&self, request: RequestFrame) -> Reply {
        if request.payload != ZERO_PAYLOAD {
            return Reply::implausible(request.tag_id);
        }
        let tag = match self.store.get(request.tag_id) {
            Some(tag) => tag,
            None => return Reply::implausible(request.tag_id),
        };
        let value = match &tag.value {
            TagValue::String(value) => value,
            _ => return Reply::implausible(request.tag_id),
        };
        if !tag.access.is_readable() {
            return Reply::unauthorized(request.tag_id);
        }

        let utf16 = text::utf8_to_utf16le(value);
        let chars = (utf16.len() / 2) as u32;
        let body = (!utf16.is_empty()).then(|| codec::string_body(&utf16));
        Reply {
            frame: ResponseFrame::new(Status::Successful, request.tag_id, chars.to_le_bytes()),
            body,
        }
    }

    /// Handles WriteString; `body` holds the announced body frames, already
    /// consumed by the connection loop so the stream stays aligned whatever
    /// this returns.
    fn handle_write_string(&self, request: RequestFrame, mut body: Vec<u8>) -> Reply {
        let tag = match self.store.get(request.tag_id) {
            Some(tag) => tag,
            None => return Reply::implausible(request.tag_id),
        };
        if tag.data_type() != TagType::String {
            return Reply::implausible(request.tag_id);
        }
        if !tag.access.is_writable() {
            return Reply::unauthorized(request.tag_id);
        }

        let chars = u32::from_le_bytes(request.payload);
        body.truncate(chars as usize * 2);
        let value = match text::utf16le_to_utf8(&body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("string body for tag {} rejected: {}", request.tag_id, e);
                return Reply::implausible(request.tag_id);
            }
        };
        match self.store.update_value(request.tag_id, TagValue::String(value)) {
            Ok(()) => Reply::new(Status::Successful, request.tag_id, ZERO_PAYLOAD),
            Err(e) => {
                tracing::warn!("write to tag {} failed: {}", request.tag_id, e);
                Reply::new(Status::WriteNotSuccessful, request.tag_id, ZERO_PAYLOAD)
            }
        }
    }
}
