//! UTF-16LE / UTF-8 transcoding.
//!
//! Tag strings are UTF-8 in memory and UTF-16LE on the wire. Decoding fails
//! explicitly on an odd byte count or on unpaired surrogates; Rust strings
//! are valid UTF-8 by construction, so the encoding direction cannot fail.

use crate::error::ProtocolError;

/// Encodes a string as UTF-16LE bytes.
pub fn utf8_to_utf16le(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decodes UTF-16LE bytes into a string.
pub fn utf16le_to_utf8(bytes: &[u8]) -> Result<String, ProtocolError> {
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::IncompleteUtf16);
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| ProtocolError::InvalidUtf16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_ascii() {
        let encoded = utf8_to_utf16le("Hi");
        assert_eq!(encoded, vec![0x48, 0x00, 0x69, 0x00]);
        assert_eq!(utf16le_to_utf8(&encoded).unwrap(), "Hi");
    }

    #[test]
    fn test_roundtrip_various() {
        for s in ["", "fill line 3", "Füllstand", "温度", "🍺 batch", "a\u{0308}"] {
            let encoded = utf8_to_utf16le(s);
            assert_eq!(encoded.len() % 2, 0);
            assert_eq!(utf16le_to_utf8(&encoded).unwrap(), s);
        }
    }

    #[test]
    fn test_supplementary_plane_uses_surrogate_pair() {
        // One code point outside the BMP occupies two code units.
        let encoded = utf8_to_utf16le("🍺");
        assert_eq!(encoded.len(), 4);
        assert_eq!(utf16le_to_utf8(&encoded).unwrap(), "🍺");
    }

    #[test]
    fn test_odd_byte_count_rejected() {
        assert!(matches!(
            utf16le_to_utf8(&[0x48, 0x00, 0x69]),
            Err(ProtocolError::IncompleteUtf16)
        ));
    }

    #[test]
    fn test_unpaired_surrogate_rejected() {
        // Lone high surrogate 0xD800.
        assert!(matches!(
            utf16le_to_utf8(&[0x00, 0xD8]),
            Err(ProtocolError::InvalidUtf16)
        ));
        // High surrogate followed by a non-surrogate unit.
        assert!(matches!(
            utf16le_to_utf8(&[0x00, 0xD8, 0x41, 0x00]),
            Err(ProtocolError::InvalidUtf16)
        ));
        // Lone low surrogate 0xDC00.
        assert!(matches!(
            utf16le_to_utf8(&[0x00, 0xDC]),
            Err(ProtocolError::InvalidUtf16)
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(utf8_to_utf16le(""), Vec::<u8>::new());
        assert_eq!(utf16le_to_utf8(&[]).unwrap(), "");
    }
}
