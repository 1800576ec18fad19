//! Tag model.
//!
//! A tag is a named, typed data point identified by a 16-bit id. The value
//! is a tagged union keyed by its data type, so a tag can never hold a
//! variant that disagrees with its declared type. Numeric values map to the
//! 4-byte little-endian payload slot of a frame; string values travel as
//! separate UTF-16LE body frames and use an all-zero payload slot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// Signed 32-bit integer, i32 LE on the wire.
    Integer,
    /// Unsigned 32-bit integer, u32 LE on the wire.
    Unsigned,
    /// IEEE-754 binary32, LE on the wire.
    Float,
    /// UTF-16LE sequence on the wire, UTF-8 in memory.
    String,
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagType::Integer => "integer",
            TagType::Unsigned => "unsigned",
            TagType::Float => "float",
            TagType::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Per-tag access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn is_readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// A typed tag value. The variant is the tag's data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TagValue {
    Integer(i32),
    Unsigned(u32),
    Float(f32),
    String(String),
}

impl TagValue {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> TagType {
        match self {
            TagValue::Integer(_) => TagType::Integer,
            TagValue::Unsigned(_) => TagType::Unsigned,
            TagValue::Float(_) => TagType::Float,
            TagValue::String(_) => TagType::String,
        }
    }

    /// Encodes the value into the 4-byte payload slot.
    ///
    /// String values use an all-zero slot; their body travels as separate
    /// frames.
    pub fn to_payload(&self) -> [u8; 4] {
        match self {
            TagValue::Integer(v) => v.to_le_bytes(),
            TagValue::Unsigned(v) => v.to_le_bytes(),
            TagValue::Float(v) => v.to_le_bytes(),
            TagValue::String(_) => [0; 4],
        }
    }

    /// Decodes a 4-byte payload slot into a value of the given numeric type.
    ///
    /// Returns `None` for [`TagType::String`]: the payload slot of a string
    /// command carries a length, not a value.
    pub fn from_payload(data_type: TagType, payload: [u8; 4]) -> Option<Self> {
        match data_type {
            TagType::Integer => Some(TagValue::Integer(i32::from_le_bytes(payload))),
            TagType::Unsigned => Some(TagValue::Unsigned(u32::from_le_bytes(payload))),
            TagType::Float => Some(TagValue::Float(f32::from_le_bytes(payload))),
            TagType::String => None,
        }
    }
}

/// A tag record. The id is unique within one server and is the registry key;
/// the name is a human-readable label and is never transmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: u16,
    pub name: String,
    pub value: TagValue,
    pub access: Access,
}

impl Tag {
    pub fn new(id: u16, name: impl Into<String>, value: TagValue, access: Access) -> Self {
        Self {
            id,
            name: name.into(),
            value,
            access,
        }
    }

    /// Returns the tag's data type, fixed for its lifetime.
    pub fn data_type(&self) -> TagType {
        self.value.data_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_modes() {
        assert!(Access::ReadOnly.is_readable());
        assert!(!Access::ReadOnly.is_writable());
        assert!(!Access::WriteOnly.is_readable());
        assert!(Access::WriteOnly.is_writable());
        assert!(Access::ReadWrite.is_readable());
        assert!(Access::ReadWrite.is_writable());
    }

    #[test]
    fn test_integer_payload_coding() {
        assert_eq!(TagValue::Integer(42).to_payload(), [0x2A, 0x00, 0x00, 0x00]);
        assert_eq!(TagValue::Integer(-1).to_payload(), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            TagValue::from_payload(TagType::Integer, [0xFF, 0xFF, 0xFF, 0xFF]),
            Some(TagValue::Integer(-1))
        );
    }

    #[test]
    fn test_unsigned_payload_coding() {
        assert_eq!(
            TagValue::Unsigned(u32::MAX).to_payload(),
            [0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            TagValue::from_payload(TagType::Unsigned, [0xFF, 0xFF, 0xFF, 0xFF]),
            Some(TagValue::Unsigned(u32::MAX))
        );
    }

    #[test]
    fn test_float_payload_coding() {
        assert_eq!(
            TagValue::Float(3.14).to_payload(),
            [0xC3, 0xF5, 0x48, 0x40]
        );
        match TagValue::from_payload(TagType::Float, [0xC3, 0xF5, 0x48, 0x40]) {
            Some(TagValue::Float(v)) => assert!((v - 3.14).abs() < 1e-3),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_string_payload_is_zero() {
        assert_eq!(TagValue::String("Hi".into()).to_payload(), [0; 4]);
        assert_eq!(TagValue::from_payload(TagType::String, [1, 2, 3, 4]), None);
    }

    #[test]
    fn test_data_type_follows_variant() {
        assert_eq!(TagValue::Integer(0).data_type(), TagType::Integer);
        assert_eq!(TagValue::Unsigned(0).data_type(), TagType::Unsigned);
        assert_eq!(TagValue::Float(0.0).data_type(), TagType::Float);
        assert_eq!(TagValue::String(String::new()).data_type(), TagType::String);
    }
}
