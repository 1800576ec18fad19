//! Padding and frame-count arithmetic for multi-frame string transfers.
//!
//! String bodies travel as whole frames: the UTF-16LE bytes are split into
//! 8-byte frames and the last frame is zero-padded. The header frame of the
//! transfer announces the length in UTF-16 code units, so both sides can
//! compute the exact number of body frames up front.

use crate::error::ProtocolError;
use crate::frame::FRAME_SIZE;
use crate::MAX_STRING_CHARS;
use bytes::BytesMut;

/// Number of 8-byte frames needed to carry `byte_len` bytes.
pub fn frames_needed(byte_len: usize) -> usize {
    byte_len.div_ceil(FRAME_SIZE)
}

/// Appends zero bytes until the buffer length is a multiple of the frame
/// size. An already aligned buffer (including an empty one) is left as is.
pub fn pad_to_frame_size(buf: &mut BytesMut) {
    let rem = buf.len() % FRAME_SIZE;
    if rem != 0 {
        buf.resize(buf.len() + (FRAME_SIZE - rem), 0);
    }
}

/// Builds the padded body for a string transfer from its UTF-16LE bytes.
pub fn string_body(utf16: &[u8]) -> BytesMut {
    let mut buf = BytesMut::from(utf16);
    pad_to_frame_size(&mut buf);
    buf
}

/// Validates an announced UTF-16 code-unit count and returns the body byte
/// length (`2 * chars`).
///
/// An announced count beyond [`MAX_STRING_CHARS`] means the peer would send
/// more body frames than either side is willing to carry; the caller must
/// treat the stream as desynchronized.
pub fn string_byte_len(chars: u32) -> Result<usize, ProtocolError> {
    if chars > MAX_STRING_CHARS {
        return Err(ProtocolError::StringTooLong {
            chars,
            max: MAX_STRING_CHARS,
        });
    }
    Ok(chars as usize * 2)
}
